pub mod clock;
pub mod input;
pub mod sink;

pub use clock::{AudioClock, Click, MockClock, SystemClock};
pub use input::{ChannelTaps, ScriptedTaps, TapEvent, TapSource};
pub use sink::{RecordingSink, ResultSink};
