//! Google Sheets v4 backend for [`engine::GridStore`].
//!
//! Only the four `spreadsheets.values` calls the repository needs are
//! implemented: `append`, `update`, `clear` and `get`. A call succeeds only
//! when Google answers `200 OK`. Requests authenticate with an access token,
//! an `authorized_user` refresh token or a service account key.

pub use client::{DEFAULT_BASE_URL, SheetsClient, SheetsClientBuilder, SheetsError};
pub use credentials::{
    AuthorizedUser, Credentials, CredentialsError, SPREADSHEETS_SCOPE, ServiceAccount,
};

mod client;
mod credentials;
mod values;
