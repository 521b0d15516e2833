pub mod capture;
pub mod scan;
pub mod watch;

pub use capture::capture;
pub use scan::scan;
pub use watch::watch;
