pub mod record;
pub mod watchlist;
