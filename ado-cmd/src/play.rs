use ado_core::source::DataSource;
use ado_timeline::speed::PlaybackSpeed;
use log::info;

use crate::view::IndexView;
use crate::{open_view, SourceArgs};

fn print_frame<D: DataSource>(view: &IndexView<D>) {
    let with_value = view.joined().map_or(0, |joined| {
        joined
            .features
            .iter()
            .filter(|feature| feature.joined_value().is_some())
            .count()
    });
    println!("{}\t{}", view.date().unwrap_or_default(), with_value);
}

/// Play `ticks` auto-play steps, printing `date<TAB>features with a value`
/// for every day shown.
pub async fn run_play(
    source: &SourceArgs,
    index: &str,
    day: Option<&str>,
    speed: PlaybackSpeed,
    ticks: usize,
    last_days: Option<i64>,
) -> anyhow::Result<()> {
    let mut view = open_view(source, index, day).await?;
    if let Some(days) = last_days {
        view.set_window(days);
    }
    view.set_speed(speed)?;

    info!("Playing {} at {} for {} steps", view.index(), speed, ticks);
    view.toggle_play();
    view.sync();
    print_frame(&view);
    for _ in 0..ticks {
        if view.next_frame().await.is_none() {
            break;
        }
        print_frame(&view);
    }
    view.toggle_play();
    Ok(())
}
