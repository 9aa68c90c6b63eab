#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}


#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub workers: usize,
    pub active_tasks: usize,
    pub queued_tasks: usize,
    pub total_submitted: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub discarded_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.workers == 0 {
            return 0.0;
        }
        self.active_tasks as f64 / self.workers as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }

    /// Задачи, которые уже приняты, но еще не завершены и не выброшены
    pub fn in_flight(&self) -> usize {
        self.total_submitted
            .saturating_sub(self.completed_tasks + self.failed_tasks + self.discarded_tasks)
    }
}
