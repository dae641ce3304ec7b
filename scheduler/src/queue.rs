use std::collections::VecDeque;

use crate::error::{Result, SchedError};
use crate::process_control_block::Pcb;
use crate::Pid;

/// An ordered collection of PCBs in transit between states
///
/// Insertion order is preserved for every element not explicitly picked
/// out by [`Queue::dequeue_shortest`] or [`Queue::remove`].
#[derive(Debug)]
pub struct Queue<C> {
    items: VecDeque<Pcb<C>>,
}

impl<C> Queue<C> {
    pub fn new() -> Queue<C> {
        Queue {
            items: VecDeque::new(),
        }
    }

    /// Appends `pcb` at the tail
    pub fn enqueue(&mut self, pcb: Pcb<C>) {
        self.items.push_back(pcb);
    }

    /// Removes the head, if any
    pub fn dequeue(&mut self) -> Option<Pcb<C>> {
        self.items.pop_front()
    }

    /// Removes the PCB with the smallest requested duration
    ///
    /// On ties the one closest to the head wins.
    pub fn dequeue_shortest(&mut self) -> Option<Pcb<C>> {
        let mut shortest: Option<(usize, u32)> = None;

        for (index, pcb) in self.items.iter().enumerate() {
            match shortest {
                Some((_, time)) if pcb.requested_ms() >= time => (),
                _ => shortest = Some((index, pcb.requested_ms())),
            }
        }

        shortest.and_then(|(index, _)| self.items.remove(index))
    }

    /// Removes the PCB with `pid` from wherever it sits
    pub fn remove(&mut self, pid: Pid) -> Option<Pcb<C>> {
        let index = self.items.iter().position(|pcb| pcb.pid() == pid)?;
        self.items.remove(index)
    }

    /// Visits every PCB once, head to tail
    ///
    /// Each PCB is handed to `visit` by value. Returning it keeps it in the
    /// queue at its original relative position; returning `None` means
    /// `visit` has moved it elsewhere or destroyed it.
    pub fn sweep<F>(&mut self, mut visit: F)
    where
        F: FnMut(Pcb<C>) -> Option<Pcb<C>>,
    {
        let pending = std::mem::take(&mut self.items);

        for pcb in pending {
            if let Some(kept) = visit(pcb) {
                self.items.push_back(kept);
            }
        }
    }

    pub fn head(&self) -> Option<&Pcb<C>> {
        self.items.front()
    }

    pub fn tail(&self) -> Option<&Pcb<C>> {
        self.items.back()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.items.iter().any(|pcb| pcb.pid() == pid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb<C>> {
        self.items.iter()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.items.iter().map(|pcb| pcb.pid()).collect()
    }
}

impl<C> Default for Queue<C> {
    fn default() -> Self {
        Queue::new()
    }
}

/// One priority level of a feedback queue
#[derive(Debug)]
pub struct Level<C> {
    quantum_ms: u32,
    queue: Queue<C>,
}

impl<C> Level<C> {
    pub fn quantum_ms(&self) -> u32 {
        self.quantum_ms
    }

    pub fn queue(&self) -> &Queue<C> {
        &self.queue
    }
}

/// Where ready PCBs wait for the CPU
#[derive(Debug)]
pub enum ReadyStructure<C> {
    /// One queue, for FIFO, SJF and RR
    Single(Queue<C>),
    /// Levels ordered from highest to lowest priority, for MLFQ
    Leveled(Vec<Level<C>>),
}

impl<C> ReadyStructure<C> {
    pub fn single() -> ReadyStructure<C> {
        ReadyStructure::Single(Queue::new())
    }

    /// Builds one level per quantum
    ///
    /// The table must be non-empty, without zero quanta, and non-decreasing.
    pub fn leveled(quanta_ms: &[u32]) -> Result<ReadyStructure<C>> {
        validate_levels(quanta_ms)?;
        Ok(ReadyStructure::from_quanta(quanta_ms))
    }

    /// Builds one level per quantum of an already validated table
    pub(crate) fn from_quanta(quanta_ms: &[u32]) -> ReadyStructure<C> {
        let levels = quanta_ms
            .iter()
            .map(|&quantum_ms| Level {
                quantum_ms,
                queue: Queue::new(),
            })
            .collect();

        ReadyStructure::Leveled(levels)
    }

    /// Admits a freshly readied PCB at the entry level
    pub fn admit(&mut self, pcb: Pcb<C>) {
        self.enqueue_at(0, pcb);
    }

    /// Enqueues `pcb` at the tail of `level`
    ///
    /// A single queue has one level only; levels past the lowest one clamp
    /// to it.
    pub fn enqueue_at(&mut self, level: usize, pcb: Pcb<C>) {
        match self {
            ReadyStructure::Single(queue) => queue.enqueue(pcb),
            ReadyStructure::Leveled(levels) => {
                let lowest = levels.len().saturating_sub(1);
                if let Some(slot) = levels.get_mut(level.min(lowest)) {
                    slot.queue.enqueue(pcb);
                }
            }
        }
    }

    /// Dequeues the head of the highest-priority non-empty queue
    pub fn dequeue_highest(&mut self) -> Option<Pcb<C>> {
        match self {
            ReadyStructure::Single(queue) => queue.dequeue(),
            ReadyStructure::Leveled(levels) => levels.iter_mut().find_map(|slot| slot.queue.dequeue()),
        }
    }

    /// Shortest job of the highest-priority non-empty queue
    pub fn dequeue_shortest(&mut self) -> Option<Pcb<C>> {
        match self {
            ReadyStructure::Single(queue) => queue.dequeue_shortest(),
            ReadyStructure::Leveled(levels) => levels
                .iter_mut()
                .find(|slot| !slot.queue.is_empty())
                .and_then(|slot| slot.queue.dequeue_shortest()),
        }
    }

    /// The quantum bound to `level`, if this structure has levels
    pub fn quantum_ms(&self, level: usize) -> Option<u32> {
        match self {
            ReadyStructure::Single(_) => None,
            ReadyStructure::Leveled(levels) => levels.get(level).map(Level::quantum_ms),
        }
    }

    /// Index of the lowest-priority level
    pub fn lowest_level(&self) -> usize {
        match self {
            ReadyStructure::Single(_) => 0,
            ReadyStructure::Leveled(levels) => levels.len().saturating_sub(1),
        }
    }

    /// The queue holding `level`
    pub fn queue(&self, level: usize) -> Option<&Queue<C>> {
        match self {
            ReadyStructure::Single(queue) if level == 0 => Some(queue),
            ReadyStructure::Single(_) => None,
            ReadyStructure::Leveled(levels) => levels.get(level).map(Level::queue),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadyStructure::Single(queue) => queue.len(),
            ReadyStructure::Leveled(levels) => levels.iter().map(|slot| slot.queue.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every ready PCB, highest level first, head to tail within a level
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Pcb<C>> + '_> {
        match self {
            ReadyStructure::Single(queue) => Box::new(queue.iter()),
            ReadyStructure::Leveled(levels) => Box::new(levels.iter().flat_map(|slot| slot.queue.iter())),
        }
    }
}

/// Checks an MLFQ quantum table
pub fn validate_levels(quanta_ms: &[u32]) -> Result<()> {
    if quanta_ms.is_empty() {
        return Err(SchedError::InvalidLevels("at least one level is required".into()));
    }

    if quanta_ms.contains(&0) {
        return Err(SchedError::InvalidLevels("quanta must be positive".into()));
    }

    if quanta_ms.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(SchedError::InvalidLevels(format!(
            "quanta must be non-decreasing, got {quanta_ms:?}"
        )));
    }

    Ok(())
}
