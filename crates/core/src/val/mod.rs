pub mod decimal;

pub use self::decimal::Decimal;
