//! Service layer separating I/O, encoding and progress concerns from the
//! pipeline logic

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use progress::{
    BatchEvent, ChannelProgressReporter, ConsoleProgressReporter, NoOpProgressReporter,
    ProgressReporter,
};
