/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

//! bounded multi-producer/multi-consumer work queue with completion tracking.
//!
//! Every pushed task (work item or stop marker) is pending until the consumer that took it drops the
//! corresponding [`Ack`]. [`WorkQueue::join`] waits until there is no pending task left. Pushing blocks
//! while the queue is full, which is what gives us backpressure between stages

use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
use kanal::{bounded_async, AsyncReceiver, AsyncSender};
use tokio::sync::Notify;

use crate::errors::{OdinEumetsatError, Result};

/// what goes through the queue. `Stop` tells the consumer that takes it to terminate
#[derive(Debug)]
pub enum Task<T> {
    Work(T),
    Stop,
}

#[derive(Debug,Default)]
struct Tracker {
    pending: AtomicUsize,
    n_acked: AtomicUsize,
    n_stops: AtomicUsize,
    notify: Notify,
}

impl Tracker {
    fn release (&self) {
        if self.pending.fetch_sub( 1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    fn ack (&self) {
        self.n_acked.fetch_add( 1, Ordering::SeqCst);
        self.release();
    }
}

/// acknowledges consumption of a task when dropped, i.e. also if the consumer fails or panics
#[must_use]
#[derive(Debug)]
pub struct Ack {
    tracker: Arc<Tracker>,
}

impl Ack {
    pub fn ack (self) {} // just consume
}

impl Drop for Ack {
    fn drop (&mut self) { self.tracker.ack() }
}

pub struct WorkQueue<T> {
    tx: AsyncSender<Task<T>>,
    rx: AsyncReceiver<Task<T>>,
    tracker: Arc<Tracker>,
    capacity: usize,
}

impl<T> Clone for WorkQueue<T> {
    fn clone (&self)->Self {
        WorkQueue { tx: self.tx.clone(), rx: self.rx.clone(), tracker: self.tracker.clone(), capacity: self.capacity }
    }
}

impl<T> WorkQueue<T> where T: Send {
    pub fn new (capacity: usize)->Self {
        let (tx, rx) = bounded_async::<Task<T>>( capacity);
        WorkQueue { tx, rx, tracker: Arc::new( Tracker::default()), capacity }
    }

    /// push a work item, waiting for space if the queue is full
    pub async fn put (&self, item: T)->Result<()> {
        self.push( Task::Work(item)).await
    }

    /// push a stop marker
    pub async fn put_stop (&self)->Result<()> {
        self.push( Task::Stop).await
    }

    async fn push (&self, task: Task<T>)->Result<()> {
        // count before sending so that a concurrent join can't see zero while the task is in flight
        self.tracker.pending.fetch_add( 1, Ordering::SeqCst);
        if self.tx.send( task).await.is_err() {
            self.tracker.release();
            Err( OdinEumetsatError::QueueClosed)
        } else {
            Ok(())
        }
    }

    /// wait for the next task. The returned Ack has to be dropped once the task is processed
    pub async fn take (&self)->Result<(Task<T>, Ack)> {
        let task = self.rx.recv().await.map_err( |_| OdinEumetsatError::QueueClosed)?;
        if let Task::Stop = task {
            self.tracker.n_stops.fetch_add( 1, Ordering::SeqCst);
        }
        Ok( (task, Ack { tracker: self.tracker.clone() }) )
    }

    /// wait until all tasks pushed so far have been acknowledged
    pub async fn join (&self) {
        loop {
            let notified = self.tracker.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable(); // register before we check to not miss a notification

            if self.pending() == 0 { return }
            notified.await;
        }
    }

    /// number of pushed but not yet acknowledged tasks (queued or in progress)
    pub fn pending (&self)->usize { self.tracker.pending.load( Ordering::SeqCst) }

    /// number of acknowledged tasks, including stop markers
    pub fn acknowledged (&self)->usize { self.tracker.n_acked.load( Ordering::SeqCst) }

    /// number of stop markers taken by consumers
    pub fn stops_taken (&self)->usize { self.tracker.n_stops.load( Ordering::SeqCst) }

    /// number of tasks currently in the queue (not yet taken)
    pub fn len (&self)->usize { self.rx.len() }

    pub fn is_empty (&self)->bool { self.rx.is_empty() }

    pub fn capacity (&self)->usize { self.capacity }

    /// close the queue. Blocked and subsequent `put` and `take` calls fail with `QueueClosed`
    pub fn close (&self) { let _ = self.tx.close(); }
}
