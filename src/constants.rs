// Backend configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:8080";

// REST table dialect
pub const REST_PATH_PREFIX: &str = "/rest/v1";
pub const API_KEY_HEADER: &str = "apikey";
pub const CREATED_AT_COLUMN: &str = "created_at";
pub const ID_COLUMN: &str = "id";

// Remote tables
pub const CATEGORIES_TABLE: &str = "categories";
pub const EXPENSES_TABLE: &str = "expenses";
pub const BACKLOG_ITEMS_TABLE: &str = "backlog_items";
pub const IDEAS_TABLE: &str = "ideas";
pub const KNOWN_TABLES: [&str; 4] = [
    CATEGORIES_TABLE,
    EXPENSES_TABLE,
    BACKLOG_ITEMS_TABLE,
    IDEAS_TABLE,
];

// Defaults
pub const DEFAULT_CATEGORY_COLOR: &str = "#007AFF";

// Validation limits
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_OBJECT_ID_LENGTH: usize = 100;
pub const MIN_BACKLOG_PRIORITY: i32 = 0;
pub const MAX_BACKLOG_PRIORITY: i32 = 5;

// Error messages
pub const ERR_DATABASE_OPERATION: &str = "Database operation failed";
pub const ERR_NOT_AUTHENTICATED: &str = "Not logged in";
pub const ERR_INVALID_API_KEY: &str = "Invalid API key";
