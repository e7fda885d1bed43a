//! Kernel configuration (spec §6: "configuration").

/// Tunables for one [`crate::kernel::Kernel`] instance. Every field has a
/// default matching the values used throughout the spec's worked examples.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub process_table_capacity: usize,
    pub mailbox_registry_capacity: usize,
    pub mutex_registry_capacity: usize,
    pub semaphore_registry_capacity: usize,
    pub execution_log_capacity: usize,

    pub round_robin_quantum: u32,
    pub priority_quantum: u32,

    pub mlfq_levels: usize,
    pub mlfq_quanta: Vec<u32>,
    pub mlfq_allotment: u32,
    pub mlfq_boost_interval: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            process_table_capacity: 32,
            mailbox_registry_capacity: 16,
            mutex_registry_capacity: 16,
            semaphore_registry_capacity: 16,
            execution_log_capacity: crate::log_ring::DEFAULT_CAPACITY,

            round_robin_quantum: 4,
            priority_quantum: 4,

            mlfq_levels: 3,
            mlfq_quanta: vec![2, 4, 8],
            mlfq_allotment: 30,
            mlfq_boost_interval: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mlfq_quanta_has_one_entry_per_level() {
        let cfg = KernelConfig::default();
        assert_eq!(cfg.mlfq_quanta.len(), cfg.mlfq_levels);
    }
}
