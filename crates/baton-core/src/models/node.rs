use super::worker::Worker;

/// Terminal sentinel used by the router contract and in `State::next`.
pub const FINISH: &str = "FINISH";

/// A node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Coordinator,
    Planner,
    /// The router that picks the next worker.
    Supervisor,
    Worker(Worker),
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Planner => "planner",
            Self::Supervisor => "supervisor",
            Self::Worker(worker) => worker.as_str(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "coordinator" => Some(Self::Coordinator),
            "planner" => Some(Self::Planner),
            "supervisor" => Some(Self::Supervisor),
            other => Worker::from_name(other).map(Self::Worker),
        }
    }

    pub fn worker(&self) -> Option<Worker> {
        match self {
            Self::Worker(worker) => Some(*worker),
            _ => None,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition target returned by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goto {
    Node(Node),
    End,
}

impl Goto {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node(node) => node.as_str(),
            Self::End => FINISH,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl std::fmt::Display for Goto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names() {
        assert_eq!(Node::Supervisor.as_str(), "supervisor");
        assert_eq!(Node::Worker(Worker::DataAnalyst).to_string(), "data_analyst");
        assert_eq!(Node::from_name("reporter"), Some(Node::Worker(Worker::Reporter)));
        assert_eq!(Node::from_name("nobody"), None);
    }

    #[test]
    fn test_goto_end_displays_finish() {
        assert_eq!(Goto::End.to_string(), FINISH);
        assert!(Goto::End.is_end());
        assert!(!Goto::Node(Node::Planner).is_end());
    }
}
