pub mod launcher;

pub use launcher::launch_browser_and_page;
