//! Integration tests for the stream output pipeline

use pdfcos::filter::decode_parameters;
use pdfcos::{
    CosConfig, CosDictionary, CosStream, Error, Filter, FilterRegistry, MemoryScratchCache, Name,
    Result, ScratchCache, ScratchKind, StreamOutput, TempFileScratchCache, Value,
};
use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Writes a fixed prefix, then copies its input
struct Prefix(&'static str);

impl Filter for Prefix {
    fn name(&self) -> &str {
        self.0
    }

    fn encode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        write!(output, "{}:", self.0)?;
        io::copy(input, output)?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        let prefix = format!("{}:", self.0);
        let body = data
            .strip_prefix(prefix.as_bytes())
            .ok_or_else(|| Error::format("missing prefix"))?;
        output.write_all(body)?;
        Ok(())
    }
}

struct Broken;

impl Filter for Broken {
    fn name(&self) -> &str {
        "Broken"
    }

    fn encode(
        &self,
        _input: &mut dyn Read,
        _output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        Err(Error::format("broken filter"))
    }

    fn decode(
        &self,
        _input: &mut dyn Read,
        _output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        Err(Error::format("broken filter"))
    }
}

/// Writes the first half of its input, then fails
struct Halfway;

impl Filter for Halfway {
    fn name(&self) -> &str {
        "Halfway"
    }

    fn encode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        output.write_all(&data[..data.len() / 2])?;
        Err(Error::format("ran out of input"))
    }

    fn decode(
        &self,
        _input: &mut dyn Read,
        _output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        Err(Error::unsupported("Halfway cannot decode"))
    }
}

/// Records the stage index and its `/DecodeParms` tag
struct ParamRecorder {
    seen: Rc<RefCell<Vec<(usize, Option<i64>)>>>,
}

impl Filter for ParamRecorder {
    fn name(&self) -> &str {
        "ParamRecorder"
    }

    fn encode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        parameters: &CosDictionary,
        index: usize,
    ) -> Result<()> {
        let tag = decode_parameters(parameters, index).get_i64(&Name::new("Tag"));
        self.seen.borrow_mut().push((index, tag));
        io::copy(input, output)?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        io::copy(input, output)?;
        Ok(())
    }
}

/// Destination that counts flushes and notices being dropped
struct Destination {
    data: Rc<RefCell<Vec<u8>>>,
    flushes: Rc<RefCell<usize>>,
    dropped: Rc<RefCell<bool>>,
}

impl Write for Destination {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.flushes.borrow_mut() += 1;
        Ok(())
    }
}

impl Drop for Destination {
    fn drop(&mut self) {
        *self.dropped.borrow_mut() = true;
    }
}

fn chain(filters: Vec<Rc<dyn Filter>>) -> Vec<Rc<dyn Filter>> {
    filters
}

mod ordering {
    use super::*;

    #[test]
    fn test_empty_chain_passes_through() {
        let cache = MemoryScratchCache::new();
        let mut output = StreamOutput::new(Vec::new(), Vec::new(), CosDictionary::new(), &cache).unwrap();
        output.write_all(b"unchanged bytes").unwrap();
        assert_eq!(output.close().unwrap(), b"unchanged bytes");
        assert_eq!(cache.stats().created(), 0);
    }

    #[test]
    fn test_reverse_application_order() {
        let cache = MemoryScratchCache::new();
        let filters = chain(vec![Rc::new(Prefix("A")), Rc::new(Prefix("B"))]);
        let mut output = StreamOutput::new(Vec::new(), filters, CosDictionary::new(), &cache).unwrap();
        output.write_all(b"original").unwrap();
        assert_eq!(output.close().unwrap(), b"A:B:original");
    }

    #[test]
    fn test_stage_index_and_parameters() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let cache = MemoryScratchCache::new();
        let params = pdfcos::CosArray::from_values(vec![
            Value::from(CosDictionary::from_entries([("Tag", Value::from(10))])),
            Value::from(CosDictionary::from_entries([("Tag", Value::from(11))])),
        ]);
        let stream_dict = CosDictionary::from_entries([("DecodeParms", Value::from(params))]);
        let filters = chain(vec![
            Rc::new(ParamRecorder { seen: seen.clone() }),
            Rc::new(ParamRecorder { seen: seen.clone() }),
        ]);
        let output = StreamOutput::new(Vec::new(), filters, stream_dict, &cache).unwrap();
        output.close().unwrap();
        assert_eq!(*seen.borrow(), vec![(1, Some(11)), (0, Some(10))]);
    }
}

mod buffering {
    use super::*;

    #[test]
    fn test_at_most_two_buffers_alive() {
        let cache = MemoryScratchCache::new();
        let filters: Vec<Rc<dyn Filter>> = (0..6)
            .map(|_| Rc::new(Prefix("x")) as Rc<dyn Filter>)
            .collect();
        let mut output = StreamOutput::new(Vec::new(), filters, CosDictionary::new(), &cache).unwrap();
        output.write_all(b"payload").unwrap();
        let result = output.close().unwrap();

        assert_eq!(result, b"x:x:x:x:x:x:payload");
        let stats = cache.stats();
        assert_eq!(stats.live(), 0);
        assert!(stats.peak() <= 2);
        // one staging buffer plus one per stage except the last
        assert_eq!(stats.created(), 6);
    }

    #[test]
    fn test_flush_is_deferred_while_buffered() {
        let data = Rc::new(RefCell::new(Vec::new()));
        let flushes = Rc::new(RefCell::new(0));
        let dropped = Rc::new(RefCell::new(false));
        let destination = Destination {
            data: data.clone(),
            flushes: flushes.clone(),
            dropped: dropped.clone(),
        };
        let cache = MemoryScratchCache::new();
        let filters = chain(vec![Rc::new(Prefix("A"))]);
        let mut output = StreamOutput::new(destination, filters, CosDictionary::new(), &cache).unwrap();
        output.write_all(b"abc").unwrap();
        output.flush().unwrap();
        assert_eq!(*flushes.borrow(), 0);
        assert!(data.borrow().is_empty());

        drop(output.close().unwrap());
        assert_eq!(*data.borrow(), b"A:abc");
        assert_eq!(*flushes.borrow(), 1);
        assert!(*dropped.borrow());
    }

    #[test]
    fn test_flush_forwards_when_unbuffered() {
        let flushes = Rc::new(RefCell::new(0));
        let destination = Destination {
            data: Rc::new(RefCell::new(Vec::new())),
            flushes: flushes.clone(),
            dropped: Rc::new(RefCell::new(false)),
        };
        let cache = MemoryScratchCache::new();
        let mut output = StreamOutput::new(destination, Vec::new(), CosDictionary::new(), &cache).unwrap();
        output.write_all(b"abc").unwrap();
        output.flush().unwrap();
        assert_eq!(*flushes.borrow(), 1);
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_failing_stage_releases_everything() {
        let dropped = Rc::new(RefCell::new(false));
        let destination = Destination {
            data: Rc::new(RefCell::new(Vec::new())),
            flushes: Rc::new(RefCell::new(0)),
            dropped: dropped.clone(),
        };
        let cache = MemoryScratchCache::new();
        let filters = chain(vec![Rc::new(Prefix("A")), Rc::new(Broken), Rc::new(Prefix("C"))]);
        let mut output = StreamOutput::new(destination, filters, CosDictionary::new(), &cache).unwrap();
        output.write_all(b"data").unwrap();

        let err = output.close().err().unwrap();
        assert!(matches!(err, Error::Pipeline(_)));
        let message = err.to_string();
        assert!(message.contains("stage 1"));
        assert!(message.contains("Broken"));
        assert_eq!(cache.stats().live(), 0);
        assert!(*dropped.borrow());
    }

    #[test]
    fn test_failing_last_stage_after_partial_output() {
        let data = Rc::new(RefCell::new(Vec::new()));
        let dropped = Rc::new(RefCell::new(false));
        let destination = Destination {
            data: data.clone(),
            flushes: Rc::new(RefCell::new(0)),
            dropped: dropped.clone(),
        };
        let cache = MemoryScratchCache::new();
        let filters = chain(vec![Rc::new(Halfway), Rc::new(Prefix("B"))]);
        let mut output = StreamOutput::new(destination, filters, CosDictionary::new(), &cache).unwrap();
        output.write_all(b"abcdef").unwrap();

        let err = output.close().err().unwrap();
        assert!(err.to_string().contains("stage 0 (Halfway)"));
        // "B:abcdef" is eight bytes, the first four reached the destination
        assert_eq!(*data.borrow(), b"B:ab");
        assert_eq!(cache.stats().live(), 0);
        assert!(*dropped.borrow());
    }

    fn registry_with_failures() -> FilterRegistry {
        let mut registry = FilterRegistry::standard(&CosConfig::default());
        registry.register(Rc::new(Broken), &[]);
        registry.register(Rc::new(Halfway), &[]);
        registry
    }

    #[test]
    fn test_failed_set_data_leaves_stream_unchanged() {
        let registry = registry_with_failures();
        let cache = MemoryScratchCache::new();
        let stream = CosStream::new();
        stream
            .set_data(b"kept", &[Name::new("AHx")], &registry, &cache)
            .unwrap();

        let filters = [Name::new("AHx"), Name::new("Broken")];
        assert!(stream.set_data(b"lost", &filters, &registry, &cache).is_err());
        assert_eq!(stream.raw_data(), b"6B657074>");
        assert_eq!(stream.filters(), vec![Name::new("AHx")]);
        assert_eq!(stream.decoded_data(&registry).unwrap(), b"kept");
        assert_eq!(cache.stats().live(), 0);
    }

    #[test]
    fn test_failed_output_close_leaves_stream_unchanged() {
        let registry = registry_with_failures();
        let cache = MemoryScratchCache::new();
        let stream = CosStream::with_dictionary(CosDictionary::new(), b"original".to_vec());

        let mut output = stream
            .create_output(&[Name::new("Halfway")], &registry, &cache)
            .unwrap();
        output.write_all(b"replacement").unwrap();
        assert!(output.close().is_err());

        assert_eq!(stream.raw_data(), b"original");
        assert!(stream.filters().is_empty());
        assert_eq!(cache.stats().live(), 0);
    }

    #[test]
    fn test_scratch_limit_surfaces_as_error() {
        let cache = MemoryScratchCache::with_limit(8);
        let filters = chain(vec![Rc::new(Prefix("A"))]);
        let mut output = StreamOutput::new(Vec::new(), filters, CosDictionary::new(), &cache).unwrap();
        assert!(output.write_all(b"more than eight bytes").is_err());
        drop(output);
        assert_eq!(cache.stats().live(), 0);
    }
}

mod configured {
    use super::*;

    #[test]
    fn test_flate_roundtrip_through_stream() {
        let config = CosConfig::default();
        let registry = FilterRegistry::standard(&config);
        let cache = config.scratch_cache();
        let content = b"0 0 m 100 100 l S\n".repeat(32);

        let stream = CosStream::new();
        stream
            .set_data(&content, &[Name::new("FlateDecode")], &registry, cache.as_ref())
            .unwrap();
        assert!(stream.raw_len() < content.len());
        assert_eq!(stream.decoded_data(&registry).unwrap(), content);
    }

    #[test]
    fn test_tempfile_scratch_cache() {
        let config = CosConfig {
            scratch: ScratchKind::TempFile,
            ..CosConfig::default()
        };
        let registry = FilterRegistry::standard(&config);
        let cache = config.scratch_cache();
        let stream = CosStream::new();
        let filters = [Name::new("AHx"), Name::new("Fl")];
        stream
            .set_data(b"through temp files", &filters, &registry, cache.as_ref())
            .unwrap();
        assert_eq!(stream.decoded_data(&registry).unwrap(), b"through temp files");
    }

    #[test]
    fn test_custom_filter_in_registry() {
        let mut registry = FilterRegistry::new();
        registry.register(Rc::new(Prefix("P")), &["Pfx"]);
        let cache = TempFileScratchCache::new();
        let stream = CosStream::new();
        stream
            .set_data(b"body", &[Name::new("Pfx")], &registry, &cache as &dyn ScratchCache)
            .unwrap();
        assert_eq!(stream.raw_data(), b"P:body");
        assert_eq!(stream.filters(), vec![Name::new("Pfx")]);
        assert_eq!(stream.decoded_data(&registry).unwrap(), b"body");
    }
}
