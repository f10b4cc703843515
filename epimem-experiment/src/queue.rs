use epimem_core::Task;

/// Ordered task list of a session; grows only through follow-up insertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Places `follow_ups` directly after `index`, shifting the rest down
    pub fn insert_after(&mut self, index: usize, follow_ups: [Task; 2]) {
        let at = (index + 1).min(self.tasks.len());
        self.tasks.splice(at..at, follow_ups);
    }
}
