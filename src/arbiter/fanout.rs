// Fan-out Arbiter
//
// Runs every constituent link as an independent channel. Writes go to every
// connected link; receives come from the first link, in priority order, that
// has a frame. Links after that one still get a housekeeping poll so their
// queues and peer bookkeeping keep moving.

use crate::link::{Link, LinkKind, LinkStats, MAX_FRAME_SIZE};

pub struct FanOutArbiter<'a> {
    links: Vec<Box<dyn Link + 'a>>,
}

impl<'a> FanOutArbiter<'a> {
    /// Compose `links`; earlier entries are polled first
    pub fn new(links: Vec<Box<dyn Link + 'a>>) -> Self {
        Self { links }
    }

    pub fn pair(primary: impl Link + 'a, secondary: impl Link + 'a) -> Self {
        Self::new(vec![
            Box::new(primary) as Box<dyn Link + 'a>,
            Box::new(secondary) as Box<dyn Link + 'a>,
        ])
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn link(&self, index: usize) -> Option<&(dyn Link + 'a)> {
        self.links.get(index).map(|l| l.as_ref())
    }

    pub fn link_mut(&mut self, index: usize) -> Option<&mut (dyn Link + 'a)> {
        self.links.get_mut(index).map(|l| l.as_mut())
    }
}

impl Link for FanOutArbiter<'_> {
    fn kind(&self) -> LinkKind {
        LinkKind::Composite
    }

    fn enable(&mut self) {
        self.links.iter_mut().for_each(|l| l.enable());
    }

    fn disable(&mut self) {
        self.links.iter_mut().for_each(|l| l.disable());
    }

    fn is_enabled(&self) -> bool {
        self.links.iter().any(|l| l.is_enabled())
    }

    fn is_connected(&self) -> bool {
        self.links.iter().any(|l| l.is_connected())
    }

    fn is_write_busy(&self) -> bool {
        self.links.iter().any(|l| l.is_enabled() && l.is_write_busy())
    }

    /// Returns the most bytes any single link accepted. A frame taken by one
    /// link and refused by another still counts as written.
    fn write_frame(&mut self, frame: &[u8]) -> usize {
        if frame.is_empty() || frame.len() > MAX_FRAME_SIZE {
            return 0;
        }
        let mut written = 0;
        for link in self.links.iter_mut().filter(|l| l.is_connected()) {
            let accepted = link.write_frame(frame);
            if accepted == 0 {
                tracing::debug!(link = %link.kind(), "fan-out write refused");
            }
            written = written.max(accepted);
        }
        written
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        let mut received = 0;
        for link in self.links.iter_mut() {
            if received > 0 {
                if link.needs_service() {
                    link.service();
                }
                continue;
            }
            received = link.check_recv_frame(dest);
        }
        received
    }

    fn needs_service(&self) -> bool {
        self.links.iter().any(|l| l.needs_service())
    }

    fn service(&mut self) {
        for link in self.links.iter_mut() {
            if link.needs_service() {
                link.service();
            }
        }
    }

    fn stats(&self) -> LinkStats {
        self.links
            .iter()
            .fold(LinkStats::default(), |acc, l| acc.merged(&l.stats()))
    }
}
