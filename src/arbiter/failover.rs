// Failover Arbiter
//
// Single-active-link policy over a priority-ordered set of links. The
// selector only moves in response to observed traffic and connection state:
// a link that delivers a frame (or accepts a write while nothing is active)
// becomes active; an active link that loses its peer is dropped, or replaced
// by the first other connected link at the next health check.

use crate::arbiter::ActiveLink;
use crate::link::{Link, LinkKind, LinkStats, MAX_FRAME_SIZE};

struct Slot<'a> {
    link: Box<dyn Link + 'a>,
    enabled: bool,
}

impl Slot<'_> {
    fn usable(&self) -> bool {
        self.enabled && self.link.is_connected()
    }
}

pub struct FailoverArbiter<'a> {
    slots: Vec<Slot<'a>>,
    active: ActiveLink,
    health_check_ticks: u32,
    ticks: u32,
}

impl<'a> FailoverArbiter<'a> {
    /// Compose `links`; earlier entries win ties
    pub fn new(links: Vec<Box<dyn Link + 'a>>) -> Self {
        Self {
            slots: links
                .into_iter()
                .map(|link| Slot { link, enabled: false })
                .collect(),
            active: ActiveLink::None,
            health_check_ticks: 1,
            ticks: 0,
        }
    }

    /// Two-link form: `primary` has priority over `secondary`
    pub fn pair(primary: impl Link + 'a, secondary: impl Link + 'a) -> Self {
        Self::new(vec![
            Box::new(primary) as Box<dyn Link + 'a>,
            Box::new(secondary) as Box<dyn Link + 'a>,
        ])
    }

    /// Run the health check every `ticks` polls instead of every poll
    pub fn with_health_check_ticks(mut self, ticks: u32) -> Self {
        self.health_check_ticks = ticks.max(1);
        self
    }

    pub fn active(&self) -> ActiveLink {
        self.active
    }

    pub fn active_kind(&self) -> Option<LinkKind> {
        self.active.index().map(|i| self.slots[i].link.kind())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn link(&self, index: usize) -> Option<&(dyn Link + 'a)> {
        self.slots.get(index).map(|s| s.link.as_ref())
    }

    pub fn link_mut(&mut self, index: usize) -> Option<&mut (dyn Link + 'a)> {
        self.slots.get_mut(index).map(|s| s.link.as_mut())
    }

    pub fn is_link_enabled(&self, index: usize) -> bool {
        self.slots.get(index).map(|s| s.enabled).unwrap_or(false)
    }

    /// Bring one constituent link into service
    pub fn enable_link(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if !slot.enabled {
                tracing::debug!(link = %slot.link.kind(), "enabling link");
                slot.link.enable();
                slot.enabled = true;
            }
        }
    }

    /// Take one constituent link out of service; clears the selector if it was active
    pub fn disable_link(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.enabled {
                tracing::debug!(link = %slot.link.kind(), "disabling link");
                slot.link.disable();
                slot.enabled = false;
            }
        }
        if self.active == ActiveLink::Link(index) {
            self.set_active(ActiveLink::None, "link disabled");
        }
    }

    /// Drop or replace an active link that lost its peer
    pub fn health_check(&mut self) {
        let Some(current) = self.active.index() else {
            return;
        };
        if self.slots[current].usable() {
            return;
        }
        let replacement = self
            .slots
            .iter()
            .enumerate()
            .find(|(i, slot)| *i != current && slot.usable())
            .map(|(i, _)| i);
        match replacement {
            Some(i) => self.set_active(ActiveLink::Link(i), "health check"),
            None => self.set_active(ActiveLink::None, "health check"),
        }
    }

    fn set_active(&mut self, next: ActiveLink, reason: &str) {
        if self.active == next {
            return;
        }
        match next.index() {
            Some(i) => tracing::info!(link = %self.slots[i].link.kind(), index = i, reason, "active link selected"),
            None => tracing::info!(reason, "no active link"),
        }
        self.active = next;
    }
}

impl Link for FailoverArbiter<'_> {
    fn kind(&self) -> LinkKind {
        LinkKind::Composite
    }

    fn enable(&mut self) {
        for i in 0..self.slots.len() {
            self.enable_link(i);
        }
    }

    fn disable(&mut self) {
        for i in 0..self.slots.len() {
            self.disable_link(i);
        }
    }

    fn is_enabled(&self) -> bool {
        self.slots.iter().any(|s| s.enabled)
    }

    fn is_connected(&self) -> bool {
        self.slots.iter().any(|s| s.usable())
    }

    fn is_write_busy(&self) -> bool {
        match self.active.index() {
            Some(i) if self.slots[i].enabled => self.slots[i].link.is_write_busy(),
            _ => self
                .slots
                .iter()
                .any(|s| s.enabled && s.link.is_write_busy()),
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> usize {
        if frame.is_empty() || frame.len() > MAX_FRAME_SIZE {
            return 0;
        }

        let tried = self.active.index();
        if let Some(i) = tried {
            if self.slots[i].usable() {
                let written = self.slots[i].link.write_frame(frame);
                if written > 0 {
                    return written;
                }
            }
        }

        for i in 0..self.slots.len() {
            if Some(i) == tried || !self.slots[i].usable() {
                continue;
            }
            let written = self.slots[i].link.write_frame(frame);
            if written > 0 {
                self.set_active(ActiveLink::Link(i), "write accepted");
                return written;
            }
        }
        0
    }

    fn check_recv_frame(&mut self, dest: &mut [u8]) -> usize {
        self.ticks += 1;
        if self.ticks >= self.health_check_ticks {
            self.ticks = 0;
            self.health_check();
        }

        let polled = self.active.index();
        if let Some(i) = polled {
            if self.slots[i].enabled {
                let len = self.slots[i].link.check_recv_frame(dest);
                if len > 0 {
                    return len;
                }
            }
            if !self.slots[i].usable() {
                self.set_active(ActiveLink::None, "active link lost");
            }
        }

        for i in 0..self.slots.len() {
            if Some(i) == polled || !self.slots[i].enabled {
                continue;
            }
            let len = self.slots[i].link.check_recv_frame(dest);
            if len > 0 {
                self.set_active(ActiveLink::Link(i), "frame received");
                return len;
            }
        }
        0
    }

    fn needs_service(&self) -> bool {
        self.slots.iter().any(|s| s.enabled && s.link.needs_service())
    }

    fn service(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.enabled) {
            slot.link.service();
        }
    }

    fn stats(&self) -> LinkStats {
        self.slots
            .iter()
            .fold(LinkStats::default(), |acc, s| acc.merged(&s.link.stats()))
    }
}
