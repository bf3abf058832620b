//! Buffer pool manager scenario tests.
//!
//! These walk the pool through pin/unpin/eviction sequences with small
//! pools, checking pin counts and residency at every step.

use latchdb::{BufferPoolManager, DiskManager, PageId};
use std::sync::Arc;
use tempfile::tempdir;

const FRAMES: usize = 10;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let dm = DiskManager::create(&path).unwrap();
    (BufferPoolManager::new(pool_size, dm), dir)
}

/// Helper to write a NUL-terminated string into page data.
fn copy_string(data: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    data[..bytes.len()].copy_from_slice(bytes);
    data[bytes.len()] = 0;
}

/// Helper to read a NUL-terminated string from page data.
fn read_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).to_string()
}

#[test]
fn test_very_basic() {
    let (bpm, _dir) = create_bpm(FRAMES);
    let str_data = "Hello, world!";

    // Allocate an id up front, then pull the page in on demand.
    let pid = bpm.allocate_page_id().unwrap();

    // Write guard basics.
    {
        let mut guard = bpm.fetch_page_write(pid).unwrap();
        copy_string(guard.as_mut_slice(), str_data);
        assert_eq!(read_string(guard.as_slice()), str_data);
    }

    // Read guard basics.
    {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(read_string(guard.as_slice()), str_data);
    }

    // And again.
    {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(read_string(guard.as_slice()), str_data);
    }

    assert!(bpm.delete_page(pid).is_ok());
}

#[test]
fn test_page_pin_easy() {
    let (bpm, _dir) = create_bpm(2);

    let pageid0 = bpm.allocate_page_id().unwrap();
    let pageid1 = bpm.allocate_page_id().unwrap();

    let str0 = "page0";
    let str1 = "page1";
    let str0_updated = "page0updated";
    let str1_updated = "page1updated";

    let temp_page_id1 = bpm.allocate_page_id().unwrap();
    let temp_page_id2 = bpm.allocate_page_id().unwrap();

    {
        let page0_write_opt = bpm.checked_write_page(pageid0);
        assert!(page0_write_opt.is_some());
        let mut page0_write = page0_write_opt.unwrap();
        copy_string(page0_write.as_mut_slice(), str0);

        let page1_write_opt = bpm.checked_write_page(pageid1);
        assert!(page1_write_opt.is_some());
        let mut page1_write = page1_write_opt.unwrap();
        copy_string(page1_write.as_mut_slice(), str1);

        assert_eq!(bpm.get_pin_count(pageid0), Some(1));
        assert_eq!(bpm.get_pin_count(pageid1), Some(1));

        // Both frames pinned: nothing else fits.
        assert!(bpm.checked_read_page(temp_page_id1).is_none());
        assert!(bpm.checked_write_page(temp_page_id2).is_none());

        page0_write.drop_guard();
        assert_eq!(bpm.get_pin_count(pageid0), Some(0));

        page1_write.drop_guard();
        assert_eq!(bpm.get_pin_count(pageid1), Some(0));
    }

    {
        // Both frames evictable now: the temp pages displace them.
        let temp_page1_opt = bpm.checked_read_page(temp_page_id1);
        assert!(temp_page1_opt.is_some());
        drop(temp_page1_opt);

        let temp_page2_opt = bpm.checked_write_page(temp_page_id2);
        assert!(temp_page2_opt.is_some());
        drop(temp_page2_opt);

        assert!(bpm.get_pin_count(pageid0).is_none());
        assert!(bpm.get_pin_count(pageid1).is_none());
    }

    {
        // Reload the originals from disk and update them.
        let mut page0_write = bpm.checked_write_page(pageid0).unwrap();
        assert_eq!(read_string(page0_write.as_slice()), str0);
        copy_string(page0_write.as_mut_slice(), str0_updated);

        let mut page1_write = bpm.checked_write_page(pageid1).unwrap();
        assert_eq!(read_string(page1_write.as_slice()), str1);
        copy_string(page1_write.as_mut_slice(), str1_updated);

        assert_eq!(bpm.get_pin_count(pageid0), Some(1));
        assert_eq!(bpm.get_pin_count(pageid1), Some(1));
    }

    assert_eq!(bpm.get_pin_count(pageid0), Some(0));
    assert_eq!(bpm.get_pin_count(pageid1), Some(0));

    {
        // The updates survived the round trip.
        let page0_read = bpm.checked_read_page(pageid0).unwrap();
        assert_eq!(read_string(page0_read.as_slice()), str0_updated);

        let page1_read = bpm.checked_read_page(pageid1).unwrap();
        assert_eq!(read_string(page1_read.as_slice()), str1_updated);

        assert_eq!(bpm.get_pin_count(pageid0), Some(1));
        assert_eq!(bpm.get_pin_count(pageid1), Some(1));
    }

    assert_eq!(bpm.get_pin_count(pageid0), Some(0));
    assert_eq!(bpm.get_pin_count(pageid1), Some(0));
}

#[test]
fn test_page_pin_medium() {
    let (bpm, _dir) = create_bpm(FRAMES);

    // An empty pool accepts a new page.
    let pid0 = bpm.allocate_page_id().unwrap();
    let mut page0 = bpm.fetch_page_write(pid0).unwrap();

    let hello = "Hello";
    copy_string(page0.as_mut_slice(), hello);
    assert_eq!(read_string(page0.as_slice()), hello);

    page0.drop_guard();

    // Hold guards to keep pages pinned.
    let mut pages = Vec::new();

    // Fill the pool (the last fill evicts the now-unpinned page 0).
    for _ in 0..FRAMES {
        let pid = bpm.allocate_page_id().unwrap();
        let page = bpm.fetch_page_write(pid).unwrap();
        pages.push(page);
    }

    for page in &pages {
        assert_eq!(bpm.get_pin_count(page.page_id()), Some(1));
    }

    // Every frame pinned: no further page fits.
    for _ in 0..FRAMES {
        let pid = bpm.allocate_page_id().unwrap();
        assert!(bpm.checked_write_page(pid).is_none());
    }

    // Release the first half.
    for _ in 0..(FRAMES / 2) {
        let pid = pages[0].page_id();
        assert_eq!(bpm.get_pin_count(pid), Some(1));
        pages.remove(0);
        assert_eq!(bpm.get_pin_count(pid), Some(0));
    }

    for page in &pages {
        assert_eq!(bpm.get_pin_count(page.page_id()), Some(1));
    }

    // Take all but one of the freed frames.
    for _ in 0..((FRAMES / 2) - 1) {
        let pid = bpm.allocate_page_id().unwrap();
        let page = bpm.fetch_page_write(pid).unwrap();
        pages.push(page);
    }

    // One candidate frame left: page 0 comes back from disk intact.
    {
        let original_page = bpm.fetch_page_read(pid0).unwrap();
        assert_eq!(read_string(original_page.as_slice()), hello);
    }

    // Pin the last frame; now fetching page 0 again must fail.
    let last_pid = bpm.allocate_page_id().unwrap();
    let _last_page = bpm.fetch_page_read(last_pid).unwrap();

    assert!(bpm.checked_read_page(pid0).is_none());
}

#[test]
fn test_drop_guard() {
    let (bpm, _dir) = create_bpm(FRAMES);

    {
        let pid0 = bpm.allocate_page_id().unwrap();
        let mut page0 = bpm.fetch_page_write(pid0).unwrap();

        assert_eq!(bpm.get_pin_count(pid0), Some(1));

        // Early release unpins.
        page0.drop_guard();
        assert_eq!(bpm.get_pin_count(pid0), Some(0));

        // A second release has no effect.
        page0.drop_guard();
        assert_eq!(bpm.get_pin_count(pid0), Some(0));
    } // Destructor runs after drop_guard; must not double-unpin.

    let pid1 = bpm.allocate_page_id().unwrap();
    let pid2 = bpm.allocate_page_id().unwrap();

    {
        let mut read_guarded_page = bpm.fetch_page_read(pid1).unwrap();
        let mut write_guarded_page = bpm.fetch_page_write(pid2).unwrap();

        assert_eq!(bpm.get_pin_count(pid1), Some(1));
        assert_eq!(bpm.get_pin_count(pid2), Some(1));

        read_guarded_page.drop_guard();
        write_guarded_page.drop_guard();
        assert_eq!(bpm.get_pin_count(pid1), Some(0));
        assert_eq!(bpm.get_pin_count(pid2), Some(0));

        read_guarded_page.drop_guard();
        write_guarded_page.drop_guard();
        assert_eq!(bpm.get_pin_count(pid1), Some(0));
        assert_eq!(bpm.get_pin_count(pid2), Some(0));
    }

    // Hangs here if a released guard left its data lock behind.
    {
        let _write_test1 = bpm.fetch_page_write(pid1).unwrap();
        let _write_test2 = bpm.fetch_page_write(pid2).unwrap();
    }

    let mut page_ids = Vec::new();
    {
        let mut guards = Vec::new();
        for _ in 0..FRAMES {
            let new_pid = bpm.allocate_page_id().unwrap();
            let guard = bpm.fetch_page_write(new_pid).unwrap();
            assert_eq!(bpm.get_pin_count(new_pid), Some(1));
            page_ids.push(new_pid);
            guards.push(guard);
        }
    } // All guards drop here.

    for pid in &page_ids {
        assert_eq!(bpm.get_pin_count(*pid), Some(0));
    }

    // Edit a page, evict it by refilling the pool, then retrieve it.
    let mutable_page_id = bpm.allocate_page_id().unwrap();
    let mut mutable_guard = bpm.fetch_page_write(mutable_page_id).unwrap();
    copy_string(mutable_guard.as_mut_slice(), "data");
    mutable_guard.drop_guard();

    {
        let mut guards = Vec::new();
        for _ in 0..FRAMES {
            let new_pid = bpm.allocate_page_id().unwrap();
            guards.push(bpm.fetch_page_write(new_pid).unwrap());
        }
    }

    {
        let guard = bpm.fetch_page_read(mutable_page_id).unwrap();
        assert_eq!(read_string(guard.as_slice()), "data");
    }
}

/// A pinned page can never lose its frame, whatever other threads do.
#[test]
fn test_pinned_page_inevictable() {
    use std::sync::{Condvar, Mutex};
    use std::thread;

    const ROUNDS: usize = 50;
    const NUM_READERS: usize = 4;

    let (bpm, _dir) = create_bpm(1); // a single frame
    let bpm = Arc::new(bpm);

    for round in 0..ROUNDS {
        // The winner occupies the only frame, then is displaced by the
        // loser so it has to be re-fetched from disk below.
        let winner_pid = bpm.allocate_page_id().unwrap();
        drop(bpm.fetch_page_write(winner_pid).unwrap());

        let loser_pid = bpm.allocate_page_id().unwrap();
        drop(bpm.fetch_page_write(loser_pid).unwrap());

        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let mut readers = Vec::new();

        for _ in 0..NUM_READERS {
            let bpm_clone = Arc::clone(&bpm);
            let signal_clone = Arc::clone(&signal);
            let winner = winner_pid;
            let loser = loser_pid;

            readers.push(thread::spawn(move || {
                let (lock, cvar) = &*signal_clone;

                {
                    let mut started = lock.lock().unwrap();
                    while !*started {
                        started = cvar.wait(started).unwrap();
                    }
                }

                // Main holds the winner pinned: reading it is a hit.
                let _read_guard = bpm_clone.fetch_page_read(winner).unwrap();

                // And the only frame being pinned, the loser cannot come in.
                assert!(
                    bpm_clone.checked_read_page(loser).is_none(),
                    "round {}: loser fetched while winner pinned",
                    round
                );
            }));
        }

        // Fetch the winner back (evicts the loser) and hold the pin.
        let winner_guard = bpm.fetch_page_read(winner_pid).unwrap();

        {
            let (lock, cvar) = &*signal;
            let mut started = lock.lock().unwrap();
            *started = true;
            cvar.notify_all();
        }

        for reader in readers {
            reader.join().unwrap();
        }

        drop(winner_guard);
    }
}

/// Holding one page's write guard must not block unrelated pool traffic.
#[test]
fn test_page_access() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    let (bpm, _dir) = create_bpm(FRAMES);
    let bpm = Arc::new(bpm);

    let pid0 = bpm.allocate_page_id().unwrap();
    let pid1 = bpm.allocate_page_id().unwrap();

    // Bring both pages into the pool.
    drop(bpm.fetch_page_write(pid0).unwrap());
    drop(bpm.fetch_page_write(pid1).unwrap());

    // Take the write latch on page 0.
    let mut guard0 = bpm.fetch_page_write(pid0).unwrap();

    let start = Arc::new(AtomicBool::new(false));
    let start_clone = Arc::clone(&start);
    let bpm_clone = Arc::clone(&bpm);

    let child = thread::spawn(move || {
        start_clone.store(true, Ordering::SeqCst);

        // Blocks until main releases page 0.
        let _guard0 = bpm_clone.fetch_page_write(pid0).unwrap();
    });

    while !start.load(Ordering::SeqCst) {
        thread::yield_now();
    }

    thread::sleep(Duration::from_millis(100));

    // While the child waits on page 0's data lock, the pool itself must
    // stay available: take page 1.
    let _guard1 = bpm.fetch_page_write(pid1).unwrap();

    guard0.drop_guard();

    child.join().unwrap();
}

#[test]
fn test_new_page_convenience() {
    let (bpm, _dir) = create_bpm(FRAMES);
    let data = b"Hello, world!";

    let pid = {
        let mut guard = bpm.new_page().unwrap();
        assert_eq!(guard.page_id(), PageId::new(0));
        guard.as_mut_slice()[..data.len()].copy_from_slice(data);
        guard.page_id()
    };

    {
        let guard = bpm.fetch_page_read(pid).unwrap();
        assert_eq!(&guard.as_slice()[..data.len()], data);
    }

    bpm.delete_page(pid).unwrap();
    assert!(!bpm.contains_page(pid));
}
