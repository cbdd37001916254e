/*! Unit tests for the IR data model and builder.
 *
 * Phi surgery and predecessor bookkeeping are what SSA construction leans on, so they get the
 * most attention here; types and formatting are covered alongside.
 */

#![allow(unused_imports)]

mod builder_tests;
mod type_tests;
