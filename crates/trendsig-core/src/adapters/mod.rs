//! Concrete source adapters.
//!
//! Each adapter speaks one upstream provider's wire format and normalizes
//! rows into the shared domain types. All of them go through the
//! [`HttpClient`](crate::http_client::HttpClient) abstraction so tests can
//! feed canned payloads.

mod eastmoney;
mod tushare;
mod yahoo;

pub use eastmoney::EastmoneyAdapter;
pub use tushare::TushareAdapter;
pub use yahoo::YahooAdapter;
