//! Frame orchestration
//!
//! `FrameState` carries everything from `prepare` (histogram sampling,
//! prefix-code construction, DC-global emission) through `process`
//! (per-group encoding under the caller's runner) to the output streamer.
//! Group buffers are disjoint, so workers never contend; the prefix codes
//! and palette lookup are read-only once `prepare` returns.

use std::sync::Mutex;

use log::debug;

use jxls_bitstream::hybrid_uint::{encode_hybrid_uint000, pack_signed};
use jxls_bitstream::{BitWriter, PrefixCode};
use jxls_color::{Palette, PaletteDetector};
use jxls_core::consts::{
    CHUNK_SIZE, DC_GROUP_DIM, GROUP_DIM, MAX_CHANNELS, MAX_FRAME_HEADER_SIZE, NUM_LZ77_SYMBOLS,
    NUM_RAW_SYMBOLS,
};
use jxls_core::{ColorSpace, Endianness, EncoderOptions, JxlsError, JxlsResult};
use jxls_headers::{
    compute_ac_group_data_offset, group_counts, write_frame_header, write_image_header, write_toc,
};

use crate::bit_depth::{BitDepth, Exactly14Bits, From9To13Bits, MoreThan14Bits, UpTo8Bits};
use crate::chunk::{ChannelRowProcessor, ChunkEncoder, ChunkSampleCollector};
use crate::dc_global::{prepare_dc_global, prepare_dc_global_palette};
use crate::input::ChunkedFrameInput;
use crate::rows::{process_image_area, process_image_area_palette};
use crate::runner::{ParallelRunner, SequentialRunner};
use crate::stream;

type GroupWriters = [BitWriter; MAX_CHANNELS];

/// Streaming position of the output drain.
#[derive(Default)]
pub(crate) struct OutputCursor {
    pub current_bit_writer: usize,
    pub bit_writer_byte_pos: usize,
    pub bits_in_buffer: usize,
    pub bit_buffer: u64,
}

/// Serialized byte size of one section (the bit-concatenation of its four
/// channel writers, rounded up to bytes).
pub(crate) fn section_size(group: &GroupWriters) -> usize {
    let mut bits = 0;
    for writer in group {
        bits += writer.bit_count();
    }
    bits.div_ceil(8)
}

/// All state of a frame being encoded.
pub struct FrameState<'a> {
    input: &'a dyn ChunkedFrameInput,
    width: usize,
    height: usize,
    num_groups_x: usize,
    num_groups_y: usize,
    num_dc_groups_x: usize,
    num_dc_groups_y: usize,
    pub(crate) nb_chans: usize,
    bitdepth: usize,
    endianness: Endianness,
    color_space: ColorSpace,
    collided: bool,
    codes: Box<[PrefixCode; MAX_CHANNELS]>,
    lookup: Vec<i16>,
    pub(crate) header: BitWriter,
    pub(crate) group_data: Vec<GroupWriters>,
    pub(crate) group_sizes: Vec<usize>,
    ac_group_data_offset: usize,
    min_dc_global_size: usize,
    pub(crate) cursor: OutputCursor,
}

impl<'a> FrameState<'a> {
    /// Samples the input, builds the prefix codes and the DC-global
    /// section. The input source must stay valid until the frame has been
    /// fully written out.
    pub fn prepare(
        input: &'a dyn ChunkedFrameInput,
        options: &EncoderOptions,
    ) -> JxlsResult<FrameState<'a>> {
        if options.width == 0 || options.height == 0 {
            return Err(JxlsError::InvalidDimensions {
                width: options.width,
                height: options.height,
            });
        }
        if options.channels == 0 || options.channels > MAX_CHANNELS {
            return Err(JxlsError::InvalidChannelCount(options.channels));
        }
        match options.bit_depth {
            1..=8 => prepare_impl(input, options, UpTo8Bits(options.bit_depth)),
            9..=13 => prepare_impl(input, options, From9To13Bits(options.bit_depth)),
            14 => prepare_impl(input, options, Exactly14Bits),
            15..=16 => prepare_impl(input, options, MoreThan14Bits(options.bit_depth)),
            other => Err(JxlsError::InvalidBitDepth(other)),
        }
    }

    /// Encodes every AC group through `runner` (sequentially when `None`).
    /// `_is_last` is reserved for multi-frame streaming; the single-frame
    /// pipeline ignores it.
    pub fn process(
        &mut self,
        _is_last: bool,
        runner: Option<&dyn ParallelRunner>,
    ) -> JxlsResult<()> {
        let runner = runner.unwrap_or(&SequentialRunner);
        match self.bitdepth {
            1..=8 => process_impl(self, UpTo8Bits(self.bitdepth), runner),
            9..=13 => process_impl(self, From9To13Bits(self.bitdepth), runner),
            14 => process_impl(self, Exactly14Bits, runner),
            _ => process_impl(self, MoreThan14Bits(self.bitdepth), runner),
        }
        Ok(())
    }

    /// Writes the image header (optional), frame header and TOC. Call after
    /// `process`; animations concatenate frames of which only the first
    /// carries the image header and only the last sets `is_last`.
    pub fn prepare_header(&mut self, add_image_header: bool, is_last: bool) {
        let output = &mut self.header;
        output.allocate(1000 + self.group_sizes.len() * 32);
        if add_image_header {
            write_image_header(
                output,
                self.width,
                self.height,
                self.nb_chans,
                self.bitdepth,
                self.color_space,
            );
        }
        let have_alpha = self.nb_chans == 2 || self.nb_chans == 4;
        write_frame_header(output, have_alpha, is_last);
        debug_assert!(add_image_header || output.bytes_written() <= MAX_FRAME_HEADER_SIZE);
        write_toc(output, &self.group_sizes);
    }

    /// Exact size of the frame once encoded.
    pub fn output_size(&self) -> usize {
        let mut total_size_groups = 0;
        for section in &self.group_data {
            total_size_groups += section_size(section);
        }
        self.header.bytes_written() + total_size_groups
    }

    /// Upper bound on the output buffer needed to drain the frame,
    /// including streaming slack.
    pub fn max_required_output(&self) -> usize {
        self.output_size() + 32
    }

    /// Writes as much of the frame as fits into `output` (at least 32
    /// bytes) and returns the byte count; 0 means the frame has been fully
    /// emitted.
    pub fn write_output(&mut self, output: &mut [u8]) -> JxlsResult<usize> {
        if output.len() < 32 {
            return Err(JxlsError::OutputBufferTooSmall {
                minimum: 32,
                actual: output.len(),
            });
        }
        Ok(stream::write_output_chunk(self, output))
    }

    /// Whether the frame is encoded through a palette transform.
    pub fn is_palette(&self) -> bool {
        !self.collided
    }

    /// Per-section serialized byte sizes, in TOC order.
    pub fn section_sizes(&self) -> &[usize] {
        &self.group_sizes
    }

    /// Byte offset where AC-group data begins in multi-group framing.
    pub fn ac_group_data_offset(&self) -> usize {
        self.ac_group_data_offset
    }

    /// Reserved size class of the DC-global section.
    pub fn min_dc_global_size(&self) -> usize {
        self.min_dc_global_size
    }
}

const BASE_RAW_COUNTS: [u64; NUM_RAW_SYMBOLS] = [
    3843, 852, 1270, 1214, 1014, 727, 481, 300, 159, 51, 5, 1, 1, 1, 1, 1, 1, 1, 1,
];

const BASE_LZ77_COUNTS: [u64; NUM_LZ77_SYMBOLS] = [
    29, 27, 25, 23, 21, 21, 19, 18, 21, 17, 16, 15, 15, 14, 13, 13, 137, 98, 61, 34, 1, 1, 1, 1,
    1, 1, 1, 1, 0, 0, 0, 0, 0,
];

fn prepare_impl<'a, B: BitDepth>(
    input: &'a dyn ChunkedFrameInput,
    options: &EncoderOptions,
    depth: B,
) -> JxlsResult<FrameState<'a>> {
    let width = options.width;
    let height = options.height;
    let nb_chans = options.channels;

    // Palette detection needs the whole image at 8 bits and is only worth
    // the scan from effort 2 up.
    let mut palette: Option<Palette> = None;
    if options.effort >= 2 && options.bit_depth == 8 && options.oneshot {
        let mut detector = PaletteDetector::new();
        'detect: for y0 in (0..height).step_by(GROUP_DIM) {
            let ys = (height - y0).min(GROUP_DIM);
            for x0 in (0..width).step_by(GROUP_DIM) {
                let xs = (width - x0).min(GROUP_DIM);
                let region = input.get_region(x0, y0, xs, ys);
                let mut collided = false;
                for y in 0..ys {
                    let offset = region.row_stride * y;
                    if detector.add_row(&region.data[offset..offset + xs * nb_chans], xs, nb_chans)
                    {
                        collided = true;
                        break;
                    }
                }
                input.release_region(region);
                if collided {
                    break 'detect;
                }
            }
        }
        palette = detector.build(nb_chans);
    }
    let collided = palette.is_none();
    let pcolors = palette.as_ref().map_or(0, |p| p.num_colors);

    let (num_groups_x, num_groups_y) = group_counts(width, height, GROUP_DIM);
    let (num_dc_groups_x, num_dc_groups_y) = group_counts(width, height, DC_GROUP_DIM);
    let onegroup = num_groups_x == 1 && num_groups_y == 1;

    let mut raw_counts = [[0u64; NUM_RAW_SYMBOLS]; MAX_CHANNELS];
    let mut lz77_counts = [[0u64; NUM_LZ77_SYMBOLS]; MAX_CHANNELS];

    let lookup_ref = palette.as_ref().map(|p| p.lookup.as_slice());
    if options.oneshot || options.effort >= 64 {
        // Past that effort the whole image is loaded anyway, so sample
        // every group. The cutoff is a tuning constant.
        for g in 0..num_groups_y * num_groups_x {
            let xg = g % num_groups_x;
            let yg = g / num_groups_x;
            let ys = (height - yg * GROUP_DIM).min(GROUP_DIM);
            let num_rows = 2 * options.effort as usize * ys / GROUP_DIM;
            collect_group_samples(
                input, width, height, xg, yg, num_rows, &mut raw_counts, &mut lz77_counts,
                onegroup, lookup_ref, depth, nb_chans, options.endianness,
            );
        }
    } else {
        // Sample the middle rows of the center group (possibly all of
        // them).
        collect_group_samples(
            input,
            width,
            height,
            (num_groups_x - 1) / 2,
            (num_groups_y - 1) / 2,
            2 * options.effort as usize * num_groups_x * num_groups_y,
            &mut raw_counts,
            &mut lz77_counts,
            onegroup,
            lookup_ref,
            depth,
            nb_chans,
            options.endianness,
        );
    }

    let doing_ycocg = nb_chans > 2 && collided;
    let large_palette = !collided || pcolors >= 256;
    let mut base_raw_counts = BASE_RAW_COUNTS;
    for count in base_raw_counts
        .iter_mut()
        .skip(depth.num_symbols(doing_ycocg || large_palette))
    {
        *count = 0;
    }
    for counts in raw_counts.iter_mut() {
        for (count, &base) in counts.iter_mut().zip(base_raw_counts.iter()) {
            *count = (*count << 8) + base;
        }
    }

    if !collided {
        let (token, _, _) = encode_hybrid_uint000(pack_signed(pcolors as i32 - 1));
        // Ensure all palette indices can actually be encoded.
        for count in raw_counts[0].iter_mut().take(token as usize + 1) {
            *count = (*count).max(1);
        }
        // These tokens are only used for the palette itself so they can
        // get a bad code.
        for i in token as usize + 1..10 {
            raw_counts[0][i] = 1;
        }
    }

    for counts in lz77_counts.iter_mut() {
        for (count, &base) in counts.iter_mut().zip(BASE_LZ77_COUNTS.iter()) {
            *count = (*count << 8) + base;
        }
    }

    let codes: Box<[PrefixCode; MAX_CHANNELS]> = Box::new(std::array::from_fn(|c| {
        PrefixCode::new(
            B::MIN_RAW_LENGTH,
            B::MAX_RAW_LENGTH,
            &raw_counts[c],
            &lz77_counts[c],
        )
    }));

    let num_dc_groups = num_dc_groups_x * num_dc_groups_y;
    let num_ac_groups = num_groups_x * num_groups_y;
    let num_groups = if onegroup {
        1
    } else {
        2 + num_dc_groups + num_ac_groups
    };
    debug!(
        "{width}x{height}x{nb_chans}@{}: {num_ac_groups} AC group(s), {num_groups} section(s), \
         palette={}",
        options.bit_depth,
        !collided,
    );

    let mut group_data: Vec<GroupWriters> = (0..num_groups).map(|_| GroupWriters::default()).collect();
    let mut group_sizes = vec![0usize; num_groups];
    match &palette {
        Some(pal) => prepare_dc_global_palette(
            onegroup,
            width,
            height,
            nb_chans,
            B::MAX_ENCODED_BITS_PER_SAMPLE,
            &codes,
            pal,
            &mut group_data[0][0],
        ),
        None => prepare_dc_global(
            onegroup,
            width,
            height,
            nb_chans,
            B::MAX_ENCODED_BITS_PER_SAMPLE,
            &codes,
            &mut group_data[0][0],
        ),
    }
    group_sizes[0] = section_size(&group_data[0]);

    let (mut ac_group_data_offset, mut min_dc_global_size) = (0, 0);
    if !onegroup {
        let offsets = compute_ac_group_data_offset(group_sizes[0], num_dc_groups, num_ac_groups);
        ac_group_data_offset = offsets.ac_group_data_offset;
        min_dc_global_size = offsets.min_dc_global_size;
    }

    Ok(FrameState {
        input,
        width,
        height,
        num_groups_x,
        num_groups_y,
        num_dc_groups_x,
        num_dc_groups_y,
        nb_chans,
        bitdepth: options.bit_depth,
        endianness: options.endianness,
        color_space: options.color_space,
        collided,
        codes,
        lookup: palette.map(|p| p.lookup).unwrap_or_default(),
        header: BitWriter::new(),
        group_data,
        group_sizes,
        ac_group_data_offset,
        min_dc_global_size,
        cursor: OutputCursor::default(),
    })
}

/// Feeds sampled rows of one group into the frequency histograms. One
/// context row precedes the sampled window; the window is clamped to the
/// acquired region.
#[allow(clippy::too_many_arguments)]
fn collect_group_samples<B: BitDepth>(
    input: &dyn ChunkedFrameInput,
    width: usize,
    height: usize,
    xg: usize,
    yg: usize,
    num_rows: usize,
    raw_counts: &mut [[u64; NUM_RAW_SYMBOLS]; MAX_CHANNELS],
    lz77_counts: &mut [[u64; NUM_LZ77_SYMBOLS]; MAX_CHANNELS],
    onegroup: bool,
    palette_lookup: Option<&[i16]>,
    depth: B,
    nb_chans: usize,
    endianness: Endianness,
) {
    let x0 = xg * GROUP_DIM;
    let y0 = yg * GROUP_DIM;
    let xs = (width - x0).min(GROUP_DIM);
    let ys = (height - y0).min(GROUP_DIM);
    let region = input.get_region(x0, y0, xs, ys);
    let y_begin = ys.saturating_sub(num_rows) / 2;
    let y_count = num_rows.min(ys - y_begin);
    let x_max = xs / CHUNK_SIZE * CHUNK_SIZE;
    let ys_total = (1 + y_count).min(ys - y_begin);

    if let Some(lookup) = palette_lookup {
        // After the palette transform there is a single index plane; in
        // one-group framing it is coded with channel slot 1.
        let slot = usize::from(onegroup);
        let mut collector = ChannelRowProcessor::new(ChunkSampleCollector {
            raw_counts: &mut raw_counts[slot],
            lz77_counts: &mut lz77_counts[slot],
        });
        process_image_area_palette(
            region.data,
            0,
            y_begin,
            x_max,
            1,
            ys_total,
            region.row_stride,
            lookup,
            nb_chans,
            &mut collector,
        );
    } else {
        let mut collectors: Vec<ChannelRowProcessor<ChunkSampleCollector<'_>>> = raw_counts
            .iter_mut()
            .zip(lz77_counts.iter_mut())
            .take(nb_chans)
            .map(|(raw_counts, lz77_counts)| {
                ChannelRowProcessor::new(ChunkSampleCollector {
                    raw_counts,
                    lz77_counts,
                })
            })
            .collect();
        process_image_area(
            region.data,
            0,
            y_begin,
            x_max,
            1,
            ys_total,
            region.row_stride,
            depth,
            nb_chans,
            endianness,
            &mut collectors,
        );
    }
    input.release_region(region);
}

fn process_impl<B: BitDepth>(frame: &mut FrameState<'_>, depth: B, runner: &dyn ParallelRunner) {
    let onegroup = frame.group_sizes.len() == 1;
    let total_groups = frame.num_groups_x * frame.num_groups_y;
    let num_dc_groups = frame.num_dc_groups_x * frame.num_dc_groups_y;
    debug!("processing {total_groups} AC group(s)");

    // Workers fill index-disjoint slots; in one-group framing the only
    // worker continues in the DC-global writers.
    let slots: Vec<Mutex<(GroupWriters, Option<usize>)>> = (0..total_groups)
        .map(|g| {
            let writers = if onegroup && g == 0 {
                std::mem::take(&mut frame.group_data[0])
            } else {
                GroupWriters::default()
            };
            Mutex::new((writers, None))
        })
        .collect();

    {
        let input = frame.input;
        let codes = &frame.codes;
        let lookup = &frame.lookup;
        let (width, height) = (frame.width, frame.height);
        let (nb_chans, endianness) = (frame.nb_chans, frame.endianness);
        let collided = frame.collided;
        let num_groups_x = frame.num_groups_x;
        let slots = &slots;

        runner.run(total_groups, &move |g| {
            let xg = g % num_groups_x;
            let yg = g / num_groups_x;
            let x0 = xg * GROUP_DIM;
            let y0 = yg * GROUP_DIM;
            let xs = (width - x0).min(GROUP_DIM);
            let ys = (height - y0).min(GROUP_DIM);
            let region = input.get_region(x0, y0, xs, ys);
            if let Ok(mut slot) = slots[g].lock() {
                let (writers, size) = &mut *slot;
                if collided {
                    write_ac_section(
                        region.data,
                        xs,
                        ys,
                        region.row_stride,
                        onegroup,
                        depth,
                        nb_chans,
                        endianness,
                        codes,
                        writers,
                    );
                } else {
                    write_ac_section_palette(
                        region.data,
                        xs,
                        ys,
                        region.row_stride,
                        onegroup,
                        codes,
                        lookup,
                        nb_chans,
                        writers,
                    );
                }
                *size = Some(section_size(writers));
            }
            input.release_region(region);
        });
    }

    for (g, slot) in slots.into_iter().enumerate() {
        let group_id = if onegroup { 0 } else { 2 + num_dc_groups + g };
        let (writers, size) = slot.into_inner().unwrap_or_else(|e| e.into_inner());
        frame.group_data[group_id] = writers;
        if let Some(size) = size {
            frame.group_sizes[group_id] = size;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn write_ac_section<B: BitDepth>(
    rgba: &[u8],
    xs: usize,
    ys: usize,
    row_stride: usize,
    is_single_group: bool,
    depth: B,
    nb_chans: usize,
    endianness: Endianness,
    codes: &[PrefixCode; MAX_CHANNELS],
    output: &mut GroupWriters,
) {
    for (i, writer) in output.iter_mut().enumerate().take(nb_chans) {
        if is_single_group && i == 0 {
            // The global modular image already owns this writer.
            continue;
        }
        writer.allocate(xs * ys * B::MAX_ENCODED_BITS_PER_SAMPLE + 4);
    }
    if !is_single_group {
        // Group header for the modular image; in one-group framing the
        // global modular image carries the pixels and there is no header.
        output[0].write(1, 1); // global tree
        output[0].write(1, 1); // all default wp
        output[0].write(2, 0b00); // 0 transforms
    }

    let mut processors: Vec<ChannelRowProcessor<ChunkEncoder<'_>>> = output
        .iter_mut()
        .zip(codes.iter())
        .take(nb_chans)
        .map(|(writer, code)| {
            ChannelRowProcessor::new(ChunkEncoder {
                code,
                output: writer,
            })
        })
        .collect();
    process_image_area(
        rgba,
        0,
        0,
        xs,
        0,
        ys,
        row_stride,
        depth,
        nb_chans,
        endianness,
        &mut processors,
    );
}

#[allow(clippy::too_many_arguments)]
fn write_ac_section_palette(
    rgba: &[u8],
    xs: usize,
    ys: usize,
    row_stride: usize,
    is_single_group: bool,
    codes: &[PrefixCode; MAX_CHANNELS],
    lookup: &[i16],
    nb_chans: usize,
    output: &mut GroupWriters,
) {
    let writer = &mut output[0];
    if !is_single_group {
        writer.allocate(16 * xs * ys + 4);
        // Group header for the modular image.
        writer.write(1, 1); // global tree
        writer.write(1, 1); // all default wp
        writer.write(2, 0b00); // 0 transforms
    }
    let code = &codes[usize::from(is_single_group)];
    let mut row_encoder = ChannelRowProcessor::new(ChunkEncoder {
        code,
        output: writer,
    });
    process_image_area_palette(
        rgba,
        0,
        0,
        xs,
        0,
        ys,
        row_stride,
        lookup,
        nb_chans,
        &mut row_encoder,
    );
}
