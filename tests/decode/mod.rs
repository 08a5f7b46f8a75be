//! Decoder and reassembly tests.

mod stream_test;
