pub mod inventory;
pub mod user;

pub use inventory::{
    AvailabilityRow, Brand, IngressDocument, LotChanges, NewBrand, NewIngressDocument,
    NewStockLot, NewVariant, StockLot, StockLotListing, StockStatus, Variant,
};
pub use user::{is_writer_role, LoginRequest, User, UserResponse};
