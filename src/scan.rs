//! Scanning for advertising devices
//!
//! A scan produces [`ScanEntry`] items, one per received advertising or scan response PDU. The
//! entries out of the adapter are wrapped in [`ScanResults`], which enforces the timeout, the
//! minimum signal strength, and the payload prefix filter regardless of how much filtering the
//! adapter did on its own.

use crate::advertising::AdvertisementKind;
use crate::assigned::AdStructIter;
use crate::{DeviceAddress, Error};
use std::time::{Duration, Instant};

/// One received advertising report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanEntry {
    address: DeviceAddress,
    rssi: i8,
    connectable: bool,
    scan_response: bool,
    data: Vec<u8>,
}

impl ScanEntry {
    pub fn new(
        address: DeviceAddress,
        rssi: i8,
        connectable: bool,
        scan_response: bool,
        data: Vec<u8>,
    ) -> Self {
        ScanEntry {
            address,
            rssi,
            connectable,
            scan_response,
            data,
        }
    }

    /// The address of the advertiser
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// The received signal strength in dBm
    pub fn rssi(&self) -> i8 {
        self.rssi
    }

    /// True if the advertiser accepts connections
    pub fn connectable(&self) -> bool {
        self.connectable
    }

    /// True if this report carries a scan response payload
    pub fn is_scan_response(&self) -> bool {
        self.scan_response
    }

    /// The raw advertising payload
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Check the payload against a sequence of length prefixed structure prefixes
    ///
    /// Each prefix is compared against the type octet onwards of every structure in the
    /// payload. With `match_all` every prefix must be found in some structure, otherwise one
    /// found prefix is enough. An empty sequence matches any payload.
    pub fn matches(&self, prefixes: &[u8], match_all: bool) -> bool {
        if prefixes.is_empty() {
            return true;
        }

        let mut remaining = prefixes;

        while let Some((&len, rest)) = remaining.split_first() {
            let len = len as usize;

            if len == 0 || rest.len() < len {
                return false;
            }

            let (prefix, rest) = rest.split_at(len);

            let found = AdStructIter::new(&self.data)
                .silent()
                .any(|ad| ad.type_and_data().starts_with(prefix));

            if found != match_all {
                // one miss fails an all-of filter, one hit satisfies an any-of filter
                return found;
            }

            remaining = rest;
        }

        match_all
    }

    /// The most specific of the given kinds that matches this entry
    pub fn classify(&self, kinds: &[AdvertisementKind]) -> Option<AdvertisementKind> {
        kinds
            .iter()
            .copied()
            .filter(|kind| kind.matches(self))
            .max_by_key(|kind| kind.specificity())
    }
}

/// Parameters of a scan
///
/// `window` must not exceed `interval`, and a one entry buffer is the minimum. Both are checked
/// by [`validate`] before the scan is handed to the adapter.
///
/// [`validate`]: ScanParameters::validate
#[derive(Clone, Debug, PartialEq)]
pub struct ScanParameters {
    /// How long to scan, or `None` to scan until the results are dropped
    pub timeout: Option<Duration>,
    /// Reports weaker than this many dBm are discarded
    pub minimum_rssi: i8,
    /// Time between the starts of two scan windows
    pub interval: Duration,
    /// Time the receiver listens within each interval
    pub window: Duration,
    /// Request scan responses from advertisers
    pub active: bool,
    /// Scan for extended advertising PDUs as well
    pub extended: bool,
    /// Number of reports the adapter may queue before dropping new ones
    pub buffer_size: usize,
}

impl Default for ScanParameters {
    fn default() -> Self {
        ScanParameters {
            timeout: None,
            minimum_rssi: -80,
            interval: Duration::from_millis(100),
            window: Duration::from_millis(100),
            active: true,
            extended: false,
            buffer_size: 512,
        }
    }
}

impl ScanParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.window > self.interval {
            return Err(Error::InvalidScanParameters("window is larger than the interval"));
        }

        if self.buffer_size == 0 {
            return Err(Error::InvalidScanParameters("buffer size is zero"));
        }

        Ok(())
    }
}

/// The filtered stream of entries of a running scan
///
/// The scan keeps running on the adapter until this is dropped or the timeout passes. The
/// timeout is also enforced here, so an adapter that ignores it still produces a terminating
/// scan.
pub struct ScanResults<I> {
    entries: I,
    deadline: Option<Instant>,
    minimum_rssi: i8,
    prefixes: Vec<u8>,
    match_all: bool,
    done: bool,
}

impl<I: Iterator<Item = ScanEntry>> ScanResults<I> {
    pub(crate) fn new(entries: I, parameters: &ScanParameters, kinds: &[AdvertisementKind]) -> Self {
        let deadline = parameters.timeout.map(|timeout| Instant::now() + timeout);

        // one unrestricted kind means every prefix rule collapses
        let match_all = kinds.iter().all(|kind| !kind.match_any());

        ScanResults {
            entries,
            deadline,
            minimum_rssi: parameters.minimum_rssi,
            prefixes: AdvertisementKind::merge_prefixes(kinds),
            match_all,
            done: false,
        }
    }
}

impl<I: Iterator<Item = ScanEntry>> Iterator for ScanResults<I> {
    type Item = ScanEntry;

    fn next(&mut self) -> Option<ScanEntry> {
        if self.done {
            return None;
        }

        loop {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.done = true;
                    return None;
                }
            }

            let entry = match self.entries.next() {
                Some(entry) => entry,
                None => {
                    self.done = true;
                    return None;
                }
            };

            if entry.rssi() < self.minimum_rssi {
                continue;
            }

            if entry.matches(&self.prefixes, self.match_all) {
                return Some(entry);
            }
        }
    }
}
