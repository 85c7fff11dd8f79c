pub mod error;
pub mod i18n;
pub mod signature;

use chrono::NaiveDate;

/// Calendar date the service considers "today".
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
