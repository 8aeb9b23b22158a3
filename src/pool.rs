use serde::Serialize;

use crate::clients::ClientId;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PostState {
    Idle,
    Occupied { client: ClientId, since: f64 },
}

#[derive(Clone, Debug)]
pub struct Post {
    pub index: usize,
    pub state: PostState,
    pub busy_time: f64,
}

impl Post {
    fn new(index: usize) -> Self {
        Self {
            index,
            state: PostState::Idle,
            busy_time: 0.0,
        }
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self.state, PostState::Occupied { .. })
    }

    pub fn client(&self) -> Option<ClientId> {
        match self.state {
            PostState::Occupied { client, .. } => Some(client),
            PostState::Idle => None,
        }
    }

    /// Busy time including the occupation still in progress at `now`.
    pub fn busy_time_at(&self, now: f64) -> f64 {
        match self.state {
            PostState::Occupied { since, .. } => self.busy_time + (now - since).max(0.0),
            PostState::Idle => self.busy_time,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PostSnapshot {
    pub occupied: bool,
    pub client: Option<ClientId>,
    pub charge_end: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ServerPool {
    posts: Vec<Post>,
}

impl ServerPool {
    pub fn new(size: usize) -> Self {
        Self {
            posts: (0..size).map(Post::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Occupies the lowest-indexed idle post.
    pub fn acquire(&mut self, client: ClientId, at: f64) -> Option<usize> {
        let post = self.posts.iter_mut().find(|post| !post.is_occupied())?;
        post.state = PostState::Occupied { client, since: at };
        Some(post.index)
    }

    pub fn release(&mut self, index: usize, at: f64) -> Result<ClientId> {
        let post = self.posts.get_mut(index).ok_or_else(|| {
            Error::InvariantViolation(format!("post {} does not exist", index + 1))
        })?;
        match post.state {
            PostState::Occupied { client, since } => {
                if at < since {
                    return Err(Error::InvariantViolation(format!(
                        "post {} released at {} before it was occupied at {}",
                        index + 1,
                        at,
                        since
                    )));
                }
                post.busy_time += at - since;
                post.state = PostState::Idle;
                Ok(client)
            }
            PostState::Idle => Err(Error::InvariantViolation(format!(
                "post {} released while idle",
                index + 1
            ))),
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.posts.iter().filter(|post| post.is_occupied()).count()
    }

    pub fn total_busy_time_at(&self, now: f64) -> f64 {
        self.posts.iter().map(|post| post.busy_time_at(now)).sum()
    }

    /// Mean of per-post busy time over `elapsed`, as a percentage.
    pub fn utilization_pct(&self, elapsed: f64) -> f64 {
        if elapsed <= 0.0 || self.is_empty() {
            return 0.0;
        }
        let mean = self.total_busy_time_at(elapsed) / (elapsed * self.len() as f64);
        (mean * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_prefers_lowest_idle_index() {
        let mut pool = ServerPool::new(3);
        assert_eq!(pool.acquire(1, 0.0), Some(0));
        assert_eq!(pool.acquire(2, 1.0), Some(1));
        pool.release(0, 2.0).expect("post 0 is occupied");
        assert_eq!(pool.acquire(3, 3.0), Some(0));
        assert_eq!(pool.acquire(4, 3.0), Some(2));
        assert_eq!(pool.acquire(5, 3.0), None);
        assert_eq!(pool.occupied_count(), 3);
    }

    #[test]
    fn release_accumulates_busy_time() {
        let mut pool = ServerPool::new(8);
        let post = pool.acquire(7, 10.0).expect("pool has idle posts");
        assert_eq!(pool.release(post, 25.5).expect("post is occupied"), 7);
        assert_eq!(pool.posts()[post].busy_time, 15.5);
        assert_eq!(pool.occupied_count(), 0);
    }

    #[test]
    fn releasing_an_idle_post_is_an_invariant_violation() {
        let mut pool = ServerPool::new(8);
        let err = pool.release(3, 1.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "internal invariant violated: post 4 released while idle"
        );
        assert!(pool.release(12, 1.0).is_err());
    }

    #[test]
    fn busy_time_includes_occupation_in_progress() {
        let mut pool = ServerPool::new(2);
        pool.acquire(1, 4.0);
        assert_eq!(pool.posts()[0].busy_time_at(10.0), 6.0);
        assert_eq!(pool.total_busy_time_at(10.0), 6.0);
        assert_eq!(pool.utilization_pct(10.0), 30.0);
    }

    #[test]
    fn utilization_guards_zero_elapsed_time() {
        let mut pool = ServerPool::new(8);
        pool.acquire(1, 0.0);
        assert_eq!(pool.utilization_pct(0.0), 0.0);
    }
}
