//! This module provides builders for the Kubernetes objects of the resource
//! bundle.
pub mod meta;
pub mod pod;
