// ABOUTME: FIT weight file encoder used for the tracker weight upload
// ABOUTME: Writes file_id, file_creator, device_info and weight_scale messages with CRCs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # FIT Weight Files
//!
//! The tracker accepts body-composition history as a FIT "weight" file. The
//! engine only needs [`WeightFileEncoder`]: an ordered batch of
//! [`WeightRecord`]s in, one complete file out. Encoding is all-or-nothing; a
//! value that does not fit its field fails the whole batch.
//!
//! Layout written by [`FitWeightEncoder`]:
//!
//! | Section        | Contents                                            |
//! |----------------|-----------------------------------------------------|
//! | header         | 14 bytes, data size, `.FIT`, header CRC             |
//! | `file_id`      | type = weight, manufacturer, product, time created  |
//! | `file_creator` | software and hardware version                       |
//! | per record     | `device_info` + `weight_scale` at the record time   |
//! | trailer        | CRC over header and data                            |

use crate::models::Measurement;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
const FIT_EPOCH_OFFSET: i64 = 631_065_600;

const HEADER_SIZE: u8 = 14;
const PROTOCOL_VERSION: u8 = 0x10;
const PROFILE_VERSION: u16 = 2132;

/// Global message numbers
mod mesg {
    pub const FILE_ID: u16 = 0;
    pub const DEVICE_INFO: u16 = 23;
    pub const WEIGHT_SCALE: u16 = 30;
    pub const FILE_CREATOR: u16 = 49;
}

/// Base type identifiers
mod base {
    pub const ENUM: u8 = 0x00;
    pub const UINT8: u8 = 0x02;
    pub const UINT16: u8 = 0x84;
    pub const UINT32: u8 = 0x86;
    pub const UINT32Z: u8 = 0x8C;
}

/// File type: weight
const FILE_TYPE_WEIGHT: u8 = 9;
/// Manufacturer id reserved for development
const MANUFACTURER_DEVELOPMENT: u16 = 255;
/// Timestamp field number shared by every timestamped message
const FIELD_TIMESTAMP: u8 = 253;

const INVALID_UINT16: u16 = u16::MAX;

/// Local message slots
const LOCAL_FILE_ID: u8 = 0;
const LOCAL_FILE_CREATOR: u8 = 1;
const LOCAL_DEVICE_INFO: u8 = 2;
const LOCAL_WEIGHT_SCALE: u8 = 3;

/// Definition-message flag on a record header
const DEFINITION_FLAG: u8 = 0x40;

/// Why a batch could not be encoded
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodeError {
    /// Nothing to encode
    #[error("no records to encode")]
    Empty,
    /// Timestamp outside the range a FIT timestamp can represent
    #[error("timestamp {0} is outside the FIT time range")]
    TimestampOutOfRange(DateTime<Utc>),
    /// A value does not fit its scaled field
    #[error("{field} value {value} does not fit the FIT field")]
    ValueOutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },
}

/// One weight-scale reading in the shape the encoder accepts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRecord {
    /// Instant of the reading
    pub timestamp: DateTime<Utc>,
    /// Weight in kilograms
    pub weight_kg: f64,
    /// Body fat percentage
    pub fat_ratio_pct: Option<f64>,
    /// Body water percentage
    pub hydration_pct: Option<f64>,
    /// Bone mass in kilograms
    pub bone_mass_kg: Option<f64>,
    /// Muscle mass in kilograms
    pub muscle_mass_kg: Option<f64>,
    /// Body-mass index
    pub bmi: Option<f64>,
}

impl From<&Measurement> for WeightRecord {
    fn from(m: &Measurement) -> Self {
        Self {
            timestamp: m.timestamp,
            weight_kg: m.weight_kg,
            fat_ratio_pct: m.fat_ratio_pct,
            hydration_pct: m.hydration_pct,
            bone_mass_kg: m.bone_mass_kg,
            muscle_mass_kg: m.muscle_mass_kg,
            bmi: m.bmi(),
        }
    }
}

/// Device and file metadata written into every file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Manufacturer id
    pub manufacturer: u16,
    /// Product id
    pub product: u16,
    /// Device serial number (0 = unknown)
    pub serial_number: u32,
    /// Software version, hundredths (e.g. 100 = 1.00)
    pub software_version: u16,
    /// Hardware version
    pub hardware_version: u8,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            manufacturer: MANUFACTURER_DEVELOPMENT,
            product: 0,
            serial_number: 0,
            software_version: 100,
            hardware_version: 1,
        }
    }
}

/// Builds a complete binary weight file from a batch of readings
pub trait WeightFileEncoder: Send + Sync {
    /// Encode `records` into one file created at `created`
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is empty or any value does not fit
    fn encode(
        &self,
        records: &[WeightRecord],
        created: DateTime<Utc>,
    ) -> Result<Vec<u8>, EncodeError>;
}

/// FIT implementation of [`WeightFileEncoder`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FitWeightEncoder {
    metadata: FileMetadata,
}

impl FitWeightEncoder {
    /// Encoder writing the given device metadata
    #[must_use]
    pub const fn new(metadata: FileMetadata) -> Self {
        Self { metadata }
    }
}

impl WeightFileEncoder for FitWeightEncoder {
    fn encode(
        &self,
        records: &[WeightRecord],
        created: DateTime<Utc>,
    ) -> Result<Vec<u8>, EncodeError> {
        if records.is_empty() {
            return Err(EncodeError::Empty);
        }
        let meta = self.metadata;
        let mut w = FitWriter::default();

        w.define(
            LOCAL_FILE_ID,
            mesg::FILE_ID,
            &[
                (0, 1, base::ENUM),
                (1, 2, base::UINT16),
                (2, 2, base::UINT16),
                (3, 4, base::UINT32Z),
                (4, 4, base::UINT32),
            ],
        );
        w.record(LOCAL_FILE_ID);
        w.u8(FILE_TYPE_WEIGHT);
        w.u16(meta.manufacturer);
        w.u16(meta.product);
        w.u32(meta.serial_number);
        w.u32(fit_timestamp(created)?);

        w.define(
            LOCAL_FILE_CREATOR,
            mesg::FILE_CREATOR,
            &[(0, 2, base::UINT16), (1, 1, base::UINT8)],
        );
        w.record(LOCAL_FILE_CREATOR);
        w.u16(meta.software_version);
        w.u8(meta.hardware_version);

        w.define(
            LOCAL_DEVICE_INFO,
            mesg::DEVICE_INFO,
            &[
                (FIELD_TIMESTAMP, 4, base::UINT32),
                (2, 2, base::UINT16),
                (3, 4, base::UINT32Z),
                (4, 2, base::UINT16),
                (5, 2, base::UINT16),
            ],
        );
        w.define(
            LOCAL_WEIGHT_SCALE,
            mesg::WEIGHT_SCALE,
            &[
                (FIELD_TIMESTAMP, 4, base::UINT32),
                (0, 2, base::UINT16),
                (1, 2, base::UINT16),
                (2, 2, base::UINT16),
                (4, 2, base::UINT16),
                (5, 2, base::UINT16),
                (13, 2, base::UINT16),
            ],
        );

        for record in records {
            let ts = fit_timestamp(record.timestamp)?;

            w.record(LOCAL_DEVICE_INFO);
            w.u32(ts);
            w.u16(meta.manufacturer);
            w.u32(meta.serial_number);
            w.u16(meta.product);
            w.u16(meta.software_version);

            w.record(LOCAL_WEIGHT_SCALE);
            w.u32(ts);
            w.u16(scaled("weight", Some(record.weight_kg), 100.0)?);
            w.u16(scaled("percent_fat", record.fat_ratio_pct, 100.0)?);
            w.u16(scaled("percent_hydration", record.hydration_pct, 100.0)?);
            w.u16(scaled("bone_mass", record.bone_mass_kg, 100.0)?);
            w.u16(scaled("muscle_mass", record.muscle_mass_kg, 100.0)?);
            w.u16(scaled("bmi", record.bmi, 10.0)?);
        }

        Ok(w.finish())
    }
}

fn fit_timestamp(at: DateTime<Utc>) -> Result<u32, EncodeError> {
    u32::try_from(at.timestamp() - FIT_EPOCH_OFFSET)
        .map_err(|_| EncodeError::TimestampOutOfRange(at))
}

/// Scale an optional value into a `uint16` field; absent values use the
/// invalid sentinel
fn scaled(field: &'static str, value: Option<f64>, scale: f64) -> Result<u16, EncodeError> {
    let Some(value) = value else {
        return Ok(INVALID_UINT16);
    };
    let raw = (value * scale).round();
    if raw.is_finite() && raw >= 0.0 && raw < f64::from(INVALID_UINT16) {
        Ok(raw as u16)
    } else {
        Err(EncodeError::ValueOutOfRange { field, value })
    }
}

/// FIT CRC-16 over `bytes`, continuing from `crc`
#[must_use]
pub fn crc16(mut crc: u16, bytes: &[u8]) -> u16 {
    const TABLE: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];
    for &byte in bytes {
        let tmp = TABLE[usize::from(crc & 0xF)];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ TABLE[usize::from(byte & 0xF)];

        let tmp = TABLE[usize::from(crc & 0xF)];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ TABLE[usize::from(byte >> 4)];
    }
    crc
}

/// Little-endian record writer
#[derive(Default)]
struct FitWriter {
    data: Vec<u8>,
}

impl FitWriter {
    fn define(&mut self, local: u8, global: u16, fields: &[(u8, u8, u8)]) {
        self.data.push(DEFINITION_FLAG | local);
        self.data.push(0); // reserved
        self.data.push(0); // little-endian architecture
        self.data.extend_from_slice(&global.to_le_bytes());
        self.data.push(fields.len() as u8);
        for &(number, size, base_type) in fields {
            self.data.extend_from_slice(&[number, size, base_type]);
        }
    }

    fn record(&mut self, local: u8) {
        self.data.push(local);
    }

    fn u8(&mut self, value: u8) {
        self.data.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn finish(self) -> Vec<u8> {
        let mut file = Vec::with_capacity(usize::from(HEADER_SIZE) + self.data.len() + 2);
        file.push(HEADER_SIZE);
        file.push(PROTOCOL_VERSION);
        file.extend_from_slice(&PROFILE_VERSION.to_le_bytes());
        file.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        file.extend_from_slice(b".FIT");
        let header_crc = crc16(0, &file);
        file.extend_from_slice(&header_crc.to_le_bytes());

        file.extend_from_slice(&self.data);
        let file_crc = crc16(0, &file);
        file.extend_from_slice(&file_crc.to_le_bytes());
        file
    }
}
