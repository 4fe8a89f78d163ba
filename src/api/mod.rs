pub mod attendance;
pub mod client;
pub mod employee;
pub mod kiosk;
pub mod report;
pub mod request;
pub mod schedule;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Page number, from 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}

impl Pagination {
    /// Cuts one page out of `items`, returning it with the effective page,
    /// page size and total count.
    pub fn apply<T>(&self, items: Vec<T>) -> (Vec<T>, u32, u32, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let total = items.len();
        let offset = ((page - 1) as usize).saturating_mul(per_page as usize);

        let data = items.into_iter().skip(offset).take(per_page as usize).collect();
        (data, page, per_page, total)
    }
}
