/// Database row types — these map directly to SQLite rows.
/// Distinct from messagely-types models to keep the DB layer independent.
/// Timestamps are RFC 3339 strings in UTC.

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub join_at: String,
    pub last_login_at: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub from_username: String,
    pub to_username: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
}

/// A message joined with both participants' profile columns.
pub struct MessageDetailRow {
    pub id: String,
    pub body: String,
    pub sent_at: String,
    pub read_at: Option<String>,
    pub from: ProfileColumns,
    pub to: ProfileColumns,
}

pub struct ProfileColumns {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}
