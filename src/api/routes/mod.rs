//! API Routes
//!
//! Route handlers organized by resource.

pub mod export;
pub mod guru;
pub mod hafalan;
pub mod health;
pub mod kaca;
pub mod partial;
pub mod reports;
pub mod santri;
pub mod users;
