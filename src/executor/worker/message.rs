use std::fmt;

use crate::executor::Work;

pub enum Message {
    Run(Work),
    Shutdown,
    Kill,
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Run(_) => write!(f, "Run"),
            Message::Shutdown => write!(f, "Shutdown"),
            Message::Kill => write!(f, "Kill"),
        }
    }
}
