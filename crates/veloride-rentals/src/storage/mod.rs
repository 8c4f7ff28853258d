pub mod bikes;
pub mod fees;
pub mod invoices;
pub mod postgres;
pub mod rentals;
pub mod zones;

pub use bikes::{Bike, BikeDirectory, InMemoryBikeDirectory, SqlBikeDirectory};

pub use fees::{FeeScheduleStore, SqlFeeScheduleRepository, StaticFeeSchedule};

pub use invoices::{InvoiceBook, InvoiceRepository, SqlInvoiceRepository};

pub use postgres::PgDatabase;

pub use rentals::{RentalRepository, SqlRentalRepository};

pub use zones::{SqlZoneRepository, ZoneStore};
