//! Shared UI icons.

use console::Emoji;

// Outcome
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static STOP: Emoji<'_, '_> = Emoji("🛑 ", "[STOP]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Run
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">>");
