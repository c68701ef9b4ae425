//! External-tool coupling (§9 design note): probe/mux hidden behind a small trait interface so
//! tests can supply fakes instead of shelling out to real `ffprobe`/`ffmpeg` binaries.

pub mod mux;
pub mod probe;

pub use mux::{MuxSpec, MuxTool, ProcessMuxTool};
pub use probe::{ProbeTool, ProcessProbeTool, StreamInfo};
