//! IIR/FIR filter design, shared by the SCSP output stage and the CD-DA sample path (spec.md §4.6).

pub mod design;
pub mod iir;
