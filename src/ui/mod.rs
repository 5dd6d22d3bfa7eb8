pub mod channel_table;
