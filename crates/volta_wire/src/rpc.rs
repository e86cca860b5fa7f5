//! Library elements and generators over a byte stream.
//!
//! [`serve`] answers [`LibraryRequest`] frames from any [`LibrarySource`]
//! until the peer closes the stream. [`LibraryClient`] is the other end: a
//! [`LibrarySource`] whose every call is one request/response exchange, so a
//! compile can instantiate a design whose definitions live in another
//! process.

use crate::error::WireError;
use crate::frame::{read_frame, write_frame};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::io::{Read, Write};
use volta_core::{BuildError, BuildResult, GeneratorValues, LibrarySource};
use volta_ir::{HierarchyBlock, LibraryElement, LibraryPath, Refinements};

/// A question for a library server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LibraryRequest {
    /// Lists the classes of a module.
    IndexModule {
        /// Dotted class-name prefix.
        module: String,
    },
    /// Fetches one element.
    Element {
        /// The class.
        path: LibraryPath,
        /// Elaborate the class as the top of a design and include its default
        /// refinements.
        top: bool,
    },
    /// Runs a generator.
    Generate {
        /// The generator class.
        path: LibraryPath,
        /// Solved values of its required inputs.
        values: GeneratorValues,
    },
}

/// A library server's answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LibraryResponse {
    /// Classes of a module.
    Index(Vec<LibraryPath>),
    /// One element, with default refinements when asked for as a top.
    Element {
        /// The element.
        element: LibraryElement,
        /// Default refinements of a top block.
        refinements: Option<Refinements>,
    },
    /// A generated block.
    Generated(HierarchyBlock),
    /// The source failed.
    Failed(RemoteFailure),
}

/// A [`BuildError`] as it crosses the wire.
///
/// Unknown classes and generator failures keep their kind so the client can
/// report them as such; everything else arrives as a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RemoteFailure {
    /// No definition for the class.
    UnknownClass(String),
    /// A generator body failed.
    Generator {
        /// Generator class.
        class: String,
        /// What went wrong.
        message: String,
    },
    /// Any other error, rendered.
    Other(String),
}

impl From<&BuildError> for RemoteFailure {
    fn from(err: &BuildError) -> Self {
        match err {
            BuildError::UnknownClass(class) => RemoteFailure::UnknownClass(class.clone()),
            BuildError::Generator { class, message } => RemoteFailure::Generator {
                class: class.clone(),
                message: message.clone(),
            },
            other => RemoteFailure::Other(other.to_string()),
        }
    }
}

impl From<RemoteFailure> for BuildError {
    fn from(failure: RemoteFailure) -> Self {
        match failure {
            RemoteFailure::UnknownClass(class) => BuildError::UnknownClass(class),
            RemoteFailure::Generator { class, message } => BuildError::Generator { class, message },
            RemoteFailure::Other(message) => BuildError::Source(message),
        }
    }
}

fn answer(source: &dyn LibrarySource, request: LibraryRequest) -> LibraryResponse {
    let result = match request {
        LibraryRequest::IndexModule { module } => {
            source.index_module(&module).map(LibraryResponse::Index)
        }
        LibraryRequest::Element { path, top: false } => {
            source.element(&path).map(|element| LibraryResponse::Element {
                element,
                refinements: None,
            })
        }
        LibraryRequest::Element { path, top: true } => {
            source.top(&path).map(|(block, refinements)| LibraryResponse::Element {
                element: LibraryElement::Block(block),
                refinements: Some(refinements),
            })
        }
        LibraryRequest::Generate { path, values } => source
            .generate(&path, &values)
            .map(LibraryResponse::Generated),
    };
    result.unwrap_or_else(|err| {
        log::debug!("library request failed: {err}");
        LibraryResponse::Failed(RemoteFailure::from(&err))
    })
}

/// Answers requests from `reader` on `writer` until `reader` ends.
///
/// Returns the number of requests answered. Failures of the source are
/// answered, not returned; only stream errors end the loop early.
pub fn serve<R: Read, W: Write>(
    source: &dyn LibrarySource,
    reader: &mut R,
    writer: &mut W,
) -> Result<usize, WireError> {
    let mut answered = 0;
    while let Some(request) = read_frame::<_, LibraryRequest>(reader)? {
        log::trace!("library request {request:?}");
        write_frame(writer, &answer(source, request))?;
        answered += 1;
    }
    log::debug!("library client closed the stream after {answered} requests");
    Ok(answered)
}

/// A [`LibrarySource`] served by another process.
pub struct LibraryClient<R, W> {
    stream: RefCell<(R, W)>,
}

impl<R: Read, W: Write> LibraryClient<R, W> {
    /// A client reading answers from `reader` and sending requests on `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            stream: RefCell::new((reader, writer)),
        }
    }

    /// Returns the stream ends.
    pub fn into_inner(self) -> (R, W) {
        self.stream.into_inner()
    }

    fn call(&self, request: &LibraryRequest) -> BuildResult<LibraryResponse> {
        let mut stream = self.stream.borrow_mut();
        let (reader, writer) = &mut *stream;
        let response = write_frame(writer, request)
            .and_then(|()| read_frame(reader))
            .map_err(|err| BuildError::Source(err.to_string()))?;
        match response {
            Some(LibraryResponse::Failed(failure)) => Err(failure.into()),
            Some(response) => Ok(response),
            None => Err(BuildError::Source(
                "the library server closed the stream".to_string(),
            )),
        }
    }
}

fn unexpected(expected: &str) -> BuildError {
    BuildError::Source(format!("the library server did not answer with {expected}"))
}

impl<R: Read, W: Write> LibrarySource for LibraryClient<R, W> {
    fn index_module(&self, module: &str) -> BuildResult<Vec<LibraryPath>> {
        let request = LibraryRequest::IndexModule {
            module: module.to_string(),
        };
        match self.call(&request)? {
            LibraryResponse::Index(paths) => Ok(paths),
            _ => Err(unexpected("a module index")),
        }
    }

    fn element(&self, path: &LibraryPath) -> BuildResult<LibraryElement> {
        let request = LibraryRequest::Element {
            path: path.clone(),
            top: false,
        };
        match self.call(&request)? {
            LibraryResponse::Element { element, .. } => Ok(element),
            _ => Err(unexpected("an element")),
        }
    }

    fn top(&self, path: &LibraryPath) -> BuildResult<(HierarchyBlock, Refinements)> {
        let request = LibraryRequest::Element {
            path: path.clone(),
            top: true,
        };
        match self.call(&request)? {
            LibraryResponse::Element {
                element: LibraryElement::Block(block),
                refinements,
            } => Ok((block, refinements.unwrap_or_default())),
            _ => Err(unexpected("a top block")),
        }
    }

    fn generate(
        &self,
        path: &LibraryPath,
        values: &GeneratorValues,
    ) -> BuildResult<HierarchyBlock> {
        let request = LibraryRequest::Generate {
            path: path.clone(),
            values: values.clone(),
        };
        match self.call(&request)? {
            LibraryResponse::Generated(block) => Ok(block),
            _ => Err(unexpected("a generated block")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volta_ir::Library;

    fn library() -> Library {
        let mut library = Library::new();
        library.insert(
            LibraryPath::new("t.Top"),
            LibraryElement::Block(HierarchyBlock::new(LibraryPath::new("t.Top"))),
        );
        library
    }

    fn replies(requests: &[LibraryRequest]) -> Vec<LibraryResponse> {
        let mut incoming = Vec::new();
        for request in requests {
            write_frame(&mut incoming, request).unwrap();
        }
        let mut outgoing = Vec::new();
        let answered = serve(&library(), &mut incoming.as_slice(), &mut outgoing).unwrap();
        assert_eq!(answered, requests.len());

        let mut reader = outgoing.as_slice();
        let mut out = Vec::new();
        while let Some(response) = read_frame(&mut reader).unwrap() {
            out.push(response);
        }
        out
    }

    #[test]
    fn server_answers_in_order() {
        let out = replies(&[
            LibraryRequest::IndexModule { module: "t".into() },
            LibraryRequest::Element {
                path: LibraryPath::new("t.Top"),
                top: true,
            },
        ]);
        assert_eq!(out[0], LibraryResponse::Index(vec![LibraryPath::new("t.Top")]));
        assert!(matches!(
            &out[1],
            LibraryResponse::Element { refinements: Some(_), .. }
        ));
    }

    #[test]
    fn failures_are_answered() {
        let out = replies(&[LibraryRequest::Element {
            path: LibraryPath::new("t.Nope"),
            top: false,
        }]);
        assert_eq!(
            out,
            vec![LibraryResponse::Failed(RemoteFailure::UnknownClass("t.Nope".into()))]
        );
    }

    #[test]
    fn failures_keep_their_kind() {
        let err = BuildError::generator("t.Gen", "count is negative");
        let back: BuildError = RemoteFailure::from(&err).into();
        assert_eq!(back, err);
        let other = BuildError::structural("t.Top", "bad");
        let back: BuildError = RemoteFailure::from(&other).into();
        assert!(matches!(back, BuildError::Source(message) if message.contains("bad")));
    }

    #[test]
    fn client_reports_a_closed_stream() {
        let closed: &[u8] = &[];
        let client = LibraryClient::new(closed, Vec::new());
        let err = client.element(&LibraryPath::new("t.Top")).unwrap_err();
        assert!(matches!(err, BuildError::Source(_)));
        let (_, sent) = client.into_inner();
        let request: LibraryRequest = crate::frame::decode(&sent).unwrap();
        assert_eq!(
            request,
            LibraryRequest::Element {
                path: LibraryPath::new("t.Top"),
                top: false,
            }
        );
    }
}
