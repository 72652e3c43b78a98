//! # Codec Command Builder
//!
//! Funzione pura che mappa la configurazione di un job alla lista di argomenti
//! per l'invocazione di ffmpeg. Nessuno stato, nessun side effect: è l'unità
//! più preziosa da testare in modo esaustivo.
//!
//! ## Regole:
//! - La filter chain include sempre uno scale a 1920x1080 che preserva
//!   l'aspect ratio; il pad centrato viene aggiunto se non disabilitato
//! - GPU: encoder hardware H.264 con `-q:v` derivato dal CRF tramite la
//!   mappatura affine `q = clamp(100 - 2*crf, 1, 100)`; `-crf` non viene mai
//!   passato in modalità hardware (i due controlli sono mutuamente esclusivi)
//! - CPU: libx264 con preset e CRF passati così come sono
//! - `-r` viene aggiunto solo quando il frame rate configurato è non-zero
//! - Audio: `-an` se mutato, altrimenti AAC a bitrate fisso e due canali
//! - `-movflags +faststart` sempre, così l'output è riproducibile mentre
//!   viene ancora scritto/scaricato

use crate::config::Config;
use std::path::Path;

/// Fixed quality used by the hardware encoder when no CRF is configured.
/// The CRF→quality mapping is a tuning heuristic, not a derived constant.
pub const DEFAULT_HW_QUALITY: u32 = 70;

/// Map a CRF value to the hardware encoder quality scale.
///
/// Higher CRF means lower quality while `-q:v` goes the other way, so the
/// mapping is an inverted affine clamped to the encoder's 1-100 range.
pub fn hardware_quality(crf: u32) -> u32 {
    if crf == 0 {
        return DEFAULT_HW_QUALITY;
    }
    (100i64 - 2 * crf as i64).clamp(1, 100) as u32
}

/// Build the ordered ffmpeg argument list for one encoder invocation.
pub fn build_encode_args(config: &Config, input: &Path, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-i".into(), input.to_string_lossy().into_owned()];

    if config.gpu {
        args.push("-c:v".into());
        args.push("h264_videotoolbox".into());
        args.push("-q:v".into());
        args.push(hardware_quality(config.crf).to_string());
    } else {
        args.push("-vcodec".into());
        args.push("libx264".into());
        args.push("-preset".into());
        args.push(config.preset.clone());
        if config.crf > 0 {
            args.push("-crf".into());
            args.push(config.crf.to_string());
        }
    }

    let mut vf = String::from("scale=1920:1080:force_original_aspect_ratio=decrease");
    if !config.no_pad {
        vf.push_str(",pad=1920:1080:(ow-iw)/2:(oh-ih)/2");
    }
    args.push("-vf".into());
    args.push(vf);
    args.push("-movflags".into());
    args.push("+faststart".into());

    if config.fps > 0 {
        args.push("-r".into());
        args.push(config.fps.to_string());
    }

    if config.mute {
        args.push("-an".into());
    } else {
        args.push("-acodec".into());
        args.push("aac".into());
        args.push("-b:a".into());
        args.push("128k".into());
        args.push("-ac".into());
        args.push("2".into());
    }

    args.push("-y".into());
    args.push(output.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn build(config: &Config) -> Vec<String> {
        build_encode_args(
            config,
            &PathBuf::from("/in/rec.mov"),
            &PathBuf::from("/out/rec.mp4"),
        )
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_software_mode_passes_crf_verbatim() {
        let config = Config {
            crf: 22,
            ..Default::default()
        };
        let args = build(&config);

        assert!(has_pair(&args, "-vcodec", "libx264"));
        assert!(has_pair(&args, "-preset", "faster"));
        assert!(has_pair(&args, "-crf", "22"));
        assert!(!args.contains(&"-q:v".to_string()));
    }

    #[test]
    fn test_hardware_mode_maps_crf_to_quality() {
        let config = Config {
            crf: 22,
            gpu: true,
            ..Default::default()
        };
        let args = build(&config);

        assert!(has_pair(&args, "-c:v", "h264_videotoolbox"));
        assert!(has_pair(&args, "-q:v", "56"));
        assert!(!args.contains(&"-crf".to_string()));
        assert!(!args.contains(&"-preset".to_string()));
    }

    #[test]
    fn test_hardware_quality_affine_mapping() {
        for crf in 1..=100u32 {
            let expected = (100i64 - 2 * crf as i64).clamp(1, 100) as u32;
            assert_eq!(hardware_quality(crf), expected, "crf {}", crf);
        }
    }

    #[test]
    fn test_hardware_quality_default_when_crf_zero() {
        assert_eq!(hardware_quality(0), DEFAULT_HW_QUALITY);

        let config = Config {
            crf: 0,
            gpu: true,
            ..Default::default()
        };
        let args = build(&config);
        assert!(has_pair(&args, "-q:v", &DEFAULT_HW_QUALITY.to_string()));
    }

    #[test]
    fn test_hardware_quality_clamps_low_end() {
        // crf 50 -> 100 - 100 = 0, clamped to 1
        assert_eq!(hardware_quality(50), 1);
        assert_eq!(hardware_quality(51), 1);
    }

    #[test]
    fn test_crf_zero_disables_explicit_value_in_software_mode() {
        let config = Config {
            crf: 0,
            ..Default::default()
        };
        let args = build(&config);
        assert!(!args.contains(&"-crf".to_string()));
        assert!(has_pair(&args, "-vcodec", "libx264"));
    }

    #[test]
    fn test_scale_always_present_pad_optional() {
        let padded = build(&Config::default());
        let vf = padded.windows(2).find(|w| w[0] == "-vf").unwrap()[1].clone();
        assert!(vf.starts_with("scale=1920:1080:force_original_aspect_ratio=decrease"));
        assert!(vf.contains("pad=1920:1080:(ow-iw)/2:(oh-ih)/2"));

        let config = Config {
            no_pad: true,
            ..Default::default()
        };
        let unpadded = build(&config);
        let vf = unpadded.windows(2).find(|w| w[0] == "-vf").unwrap()[1].clone();
        assert_eq!(vf, "scale=1920:1080:force_original_aspect_ratio=decrease");
    }

    #[test]
    fn test_fps_only_when_nonzero() {
        let args = build(&Config::default());
        assert!(has_pair(&args, "-r", "30"));

        let config = Config {
            fps: 0,
            ..Default::default()
        };
        let args = build(&config);
        assert!(!args.contains(&"-r".to_string()));
    }

    #[test]
    fn test_audio_mute_vs_aac() {
        let args = build(&Config::default());
        assert!(has_pair(&args, "-acodec", "aac"));
        assert!(has_pair(&args, "-b:a", "128k"));
        assert!(has_pair(&args, "-ac", "2"));
        assert!(!args.contains(&"-an".to_string()));

        let config = Config {
            mute: true,
            ..Default::default()
        };
        let args = build(&config);
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-acodec".to_string()));
    }

    #[test]
    fn test_faststart_always_requested() {
        for gpu in [false, true] {
            let config = Config {
                gpu,
                ..Default::default()
            };
            let args = build(&config);
            assert!(has_pair(&args, "-movflags", "+faststart"));
        }
    }

    #[test]
    fn test_builder_is_deterministic() {
        let config = Config::default();
        assert_eq!(build(&config), build(&config));
    }

    #[test]
    fn test_input_first_output_last() {
        let args = build(&Config::default());
        assert_eq!(args[0], "-i");
        assert_eq!(args[1], "/in/rec.mov");
        assert_eq!(args.last().unwrap(), "/out/rec.mp4");
    }
}
