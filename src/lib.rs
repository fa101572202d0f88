
pub mod core {
    pub mod config;
    pub mod error;
    pub mod report;
    pub mod runner;
    pub mod tester;
}


pub mod testers {
    pub mod cpu;
    pub mod gpio;
}


pub mod reporters;
