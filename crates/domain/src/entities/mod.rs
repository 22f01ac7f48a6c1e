pub mod pool;
pub mod position;

// Re-export for easier access
pub use pool::Pool;
pub use position::LiquidityPosition;
