use std::fmt;
use std::ops::Add;

/// Simulated time, in milliseconds since the server started
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a new Timestamp object
    ///
    /// * `time` - inital value of the Timestamp, in milliseconds
    pub fn new(time: u64) -> Timestamp {
        Timestamp(time)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// The value carried in the `time_ms` field of a wire message
    ///
    /// Saturates instead of wrapping once the clock outgrows 32 bits.
    pub fn as_wire(&self) -> u32 {
        u32::try_from(self.0).unwrap_or(u32::MAX)
    }
}

impl Add<u32> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: u32) -> Self::Output {
        Timestamp::new(self.0 + u64::from(rhs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.0)
    }
}

/// Process identifier, assigned by the server when a client connects
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(u32);

impl Pid {
    pub fn new(pid: u32) -> Pid {
        Pid(pid)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Add<u32> for Pid {
    type Output = Pid;

    fn add(self, rhs: u32) -> Self::Output {
        Pid::new(self.0 + rhs)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The simulated clock: the current time and the fixed increment it advances by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    now: Timestamp,
    tick_ms: u32,
}

impl Clock {
    pub fn new(tick_ms: u32) -> Clock {
        Clock {
            now: Timestamp::new(0),
            tick_ms,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn tick_ms(&self) -> u32 {
        self.tick_ms
    }

    /// Moves the clock forward by one tick
    pub fn advance(&mut self) {
        self.now = self.now + self.tick_ms;
    }
}
