// User-facing status texts.

/// Reply in the channel right after a request is queued.
pub const QUEUED: &str = "⏳ waitt yaa bebsss";

/// Channel notice when the worker picks the job up. Reveals neither category nor quantity.
pub const PICKED_UP: &str = "📥 cek japri ya bebsss...";

/// First private message; doubles as a reachability check.
pub const DELIVERY_STARTING: &str = "📦 Ini yaa boskuu 🤩";

pub const INSUFFICIENT_STOCK: &str = "❌ Stok kureng nihh boskuuu";

pub const COMPLETED: &str = "✅ Done ya bebsss, semangat yaa 🥰";

pub const FAILED: &str = "❌ Gagal kirim file. Pastikan kamu sudah /start bot.";
