//! Status glyphs shared by the command output.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");
pub static MONEY: Emoji<'_, '_> = Emoji("💰 ", "$ ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "");
pub static ARROW: Emoji<'_, '_> = Emoji("➜ ", "-> ");
