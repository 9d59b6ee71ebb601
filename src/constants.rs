pub const CONFIG_FOLDER_NAME: &str = "cloudflare-dns-manager";
pub const CONFIG_FILE_NAME: &str = "settings.toml";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IP_LOOKUP_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_UI: &str = "tui";

/// Cloudflare caps `per_page` at 50 for zones.
pub const ZONES_PER_PAGE: u32 = 50;
pub const RECORDS_PER_PAGE: u32 = 100;

/// TTL value Cloudflare reads as "automatic".
pub const AUTO_TTL: u32 = 1;

/// Typed at the delete prompt of the menu mode to remove every record of a zone.
pub const BULK_DELETE_COMMAND: &str = "Delete all records";

/// Typed at the content prompt of the menu mode to use the public IP.
pub const PUBLIC_IP_SHORTCUT: &str = "+++";
