//! LibXML2 FFI wrapper for XML Schema validation.
//!
//! The Rust ecosystem has no mature pure-Rust XSD validator, so schema
//! compilation and validation go through libxml2 directly. The wrapper keeps
//! the FFI surface small: parse a schema from memory, validate a file against
//! it, and collect structured diagnostics with line/column positions.
//!
//! Thread safety (per <http://xmlsoft.org/threads.html>): schema *parsing* is
//! not thread-safe and must be serialized; *validation* against an already
//! parsed schema is safe to run in parallel as long as each caller creates its
//! own validation context. Compiled schemas are shared via `Arc`.

use std::ffi::CString;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Once};

use libc::{c_char, c_int, c_uint};

use crate::error::{LibXml2Error, LibXml2Result};

/// Global initialization flag for libxml2.
///
/// libxml2's initialization functions are not thread-safe, so they run exactly
/// once behind `std::sync::Once`.
static LIBXML2_INIT: Once = Once::new();

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    // Schema parsing functions
    pub fn xmlSchemaNewMemParserCtxt(
        buffer: *const c_char,
        size: c_int,
    ) -> *mut XmlSchemaParserCtxt;

    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaValidateFile(
        ctxt: *const XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;

    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        sherr: XmlStructuredErrorFunc,
        ctx: *mut libc::c_void,
    );
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut libc::c_void,
    pub node: *mut libc::c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut libc::c_void, error: *mut xmlError)>;

/// One schema-validator diagnostic with its document position.
///
/// `int2` in `xmlError` carries the column for validity errors; both line and
/// column are 0 when libxml2 has no position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub line: i32,
    pub column: i32,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}, Column {}: {}", self.line, self.column, self.message)
    }
}

/// Callback for libxml2 to report validation errors (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut libc::c_void, error: *mut xmlError) {
    let violations = unsafe { &mut *(user_data as *mut Vec<SchemaViolation>) };

    if !error.is_null() {
        let msg_ptr = unsafe { (*error).message };
        if !msg_ptr.is_null() {
            let c_str = unsafe { std::ffi::CStr::from_ptr(msg_ptr) };
            if let Ok(s) = c_str.to_str() {
                violations.push(SchemaViolation {
                    line: unsafe { (*error).line },
                    column: unsafe { (*error).int2 },
                    message: s.trim().to_string(),
                });
            }
        }
    }
}

/// Thread-safe wrapper for a compiled libxml2 schema with RAII cleanup.
#[derive(Debug)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: libxml2 documents xmlSchema structures as thread-safe for reading.
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// Wrap a raw schema pointer.
    ///
    /// # Safety
    ///
    /// The pointer must have been returned by `xmlSchemaParse`, must not be
    /// freed elsewhere, and must not be aliased by another owner.
    pub(crate) unsafe fn from_raw(ptr: *mut XmlSchema) -> LibXml2Result<Self> {
        if ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed);
        }

        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    /// Get the raw pointer for FFI calls.
    ///
    /// Valid only while this `XmlSchemaPtr` is alive; the caller must not
    /// free it.
    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.inner.ptr
    }

    /// Check if the schema pointer is valid (non-null)
    pub fn is_valid(&self) -> bool {
        !self.inner.ptr.is_null()
    }
}

impl Clone for XmlSchemaPtr {
    fn clone(&self) -> Self {
        XmlSchemaPtr {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        // The Arc ensures this runs exactly once per compiled schema.
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = std::ptr::null_mut();
        }
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaValidation {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with schema violations (return code > 0)
    Invalid { violations: Vec<SchemaViolation> },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32 },
}

impl SchemaValidation {
    /// Create a result from a libxml2 return code and captured diagnostics.
    pub fn from_code(code: c_int, violations: Vec<SchemaViolation>) -> Self {
        match code {
            0 => SchemaValidation::Valid,
            n if n > 0 => SchemaValidation::Invalid { violations },
            n => SchemaValidation::InternalError { code: n },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SchemaValidation::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, SchemaValidation::Invalid { .. })
    }
}

/// Safe access to libxml2 schema parsing and validation.
///
/// Construction initializes libxml2 exactly once. Validation creates a fresh
/// validation context per call, so it may run concurrently from multiple
/// threads against the same shared `XmlSchemaPtr`.
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse an XML schema from a memory buffer.
    ///
    /// Schema parsing is NOT thread-safe in libxml2; callers must not invoke
    /// this concurrently. The schema store serializes compilation through its
    /// single-flight cache, so each schema is parsed at most once.
    pub fn parse_schema_from_memory(&self, schema_data: &[u8]) -> LibXml2Result<XmlSchemaPtr> {
        unsafe {
            let parser_ctxt = xmlSchemaNewMemParserCtxt(
                schema_data.as_ptr() as *const c_char,
                schema_data.len() as c_int,
            );

            if parser_ctxt.is_null() {
                return Err(LibXml2Error::MemoryAllocation);
            }

            let schema_ptr = xmlSchemaParse(parser_ctxt);

            // Always free the parser context
            xmlSchemaFreeParserCtxt(parser_ctxt);

            if schema_ptr.is_null() {
                return Err(LibXml2Error::SchemaParseFailed);
            }

            XmlSchemaPtr::from_raw(schema_ptr)
        }
    }

    /// Validate an XML file against a compiled schema.
    ///
    /// Thread-safe: each call creates its own validation context and the
    /// schema pointer is only read.
    pub fn validate_file(
        &self,
        schema: &XmlSchemaPtr,
        file_path: &Path,
    ) -> LibXml2Result<SchemaValidation> {
        unsafe {
            let path_str = file_path
                .to_str()
                .ok_or_else(|| LibXml2Error::ValidationFailed {
                    code: -1,
                    file: file_path.to_path_buf(),
                })?;

            let c_path = CString::new(path_str).map_err(|_| LibXml2Error::ValidationFailed {
                code: -1,
                file: file_path.to_path_buf(),
            })?;

            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            let mut violations: Vec<SchemaViolation> = Vec::new();
            let violations_ptr = &mut violations as *mut Vec<SchemaViolation> as *mut libc::c_void;

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                violations_ptr,
            );

            let result_code = xmlSchemaValidateFile(valid_ctxt, c_path.as_ptr(), 0);

            // Always free the validation context
            xmlSchemaFreeValidCtxt(valid_ctxt);

            let result = SchemaValidation::from_code(result_code, violations);

            if let SchemaValidation::InternalError { code } = result {
                return Err(LibXml2Error::ValidationFailed {
                    code,
                    file: file_path.to_path_buf(),
                });
            }

            Ok(result)
        }
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LibXml2Wrapper {
    fn drop(&mut self) {
        // xmlCleanupParser() is only safe once at process exit with no other
        // libxml2 users; in a library context we let the OS reclaim instead.
    }
}
