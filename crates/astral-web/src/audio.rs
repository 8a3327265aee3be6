use web_sys as web;

/// Analyser tapped off an `<audio>` element. The element keeps playing to the
/// speakers; the analyser only reads.
pub struct AudioTap {
    ctx: web::AudioContext,
    analyser: web::AnalyserNode,
    bins: Vec<u8>,
}

impl AudioTap {
    /// Must run inside a user gesture, otherwise the context starts suspended.
    pub fn attach(media: &web::HtmlMediaElement) -> anyhow::Result<Self> {
        let ctx = web::AudioContext::new()
            .map_err(|e| anyhow::anyhow!(format!("AudioContext error: {:?}", e)))?;
        let analyser = ctx
            .create_analyser()
            .map_err(|e| anyhow::anyhow!(format!("AnalyserNode error: {:?}", e)))?;
        analyser.set_fft_size(256);
        analyser.set_smoothing_time_constant(0.0); // smoothing happens in the aggregator

        let source = ctx
            .create_media_element_source(media)
            .map_err(|e| anyhow::anyhow!(format!("MediaElementSource error: {:?}", e)))?;
        source
            .connect_with_audio_node(&analyser)
            .map_err(|e| anyhow::anyhow!(format!("connect error: {:?}", e)))?;
        analyser
            .connect_with_audio_node(&ctx.destination())
            .map_err(|e| anyhow::anyhow!(format!("connect error: {:?}", e)))?;

        let bins = vec![0u8; analyser.frequency_bin_count() as usize];
        log::info!("[audio] analyser attached ({} bins)", bins.len());
        Ok(Self { ctx, analyser, bins })
    }

    pub fn is_running(&self) -> bool {
        self.ctx.state() == web::AudioContextState::Running
    }

    /// Latest byte spectrum, 0..=255 per bin.
    pub fn spectrum(&mut self) -> &[u8] {
        self.analyser.get_byte_frequency_data(&mut self.bins);
        &self.bins
    }
}
