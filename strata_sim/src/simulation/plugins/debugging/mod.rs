pub mod scan_stats;
