pub mod billing;
pub mod invoices;
pub mod lifecycle;
pub mod rentals;
pub mod types;
pub mod zones;

pub use billing::BillingCalculator;
pub use invoices::{Invoice, InvoiceIssuer};
pub use lifecycle::{RentalCompleted, RentalLifecycleOrchestrator, RentalStarted};
pub use rentals::{Rental, RentalLedger};
pub use types::{BikeId, CustomerId, FeeSchedule, InvoiceId, InvoiceStatus, RentalId, ZoneId, ZoneLabel, ZoneType};
pub use zones::{Polygon, Zone, ZoneClassifier, ZoneIndex};
