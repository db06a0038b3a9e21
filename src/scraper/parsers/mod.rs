//! HTML parsers for netkeiba.com pages.

pub mod horse;
pub mod race_card;
pub mod race_list;
pub mod race_meta;

pub use horse::HorseParser;
pub use race_card::RaceCardParser;
pub use race_list::RaceListParser;
