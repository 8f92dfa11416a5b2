pub mod lidar;
