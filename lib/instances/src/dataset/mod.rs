pub mod vrptw;
