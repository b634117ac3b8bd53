pub mod sales_sync;
