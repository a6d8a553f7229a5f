// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use logfacade::Backend;
use logfacade::Fields;
use logfacade::Formatter;
use logfacade::Level;
use logfacade::Logger;
use logfacade::layout::TextSettings;

fn main() -> Result<(), logfacade::Error> {
    let logger = Logger::new(
        Backend::Text(TextSettings::default()),
        Formatter::default(),
    )?;
    logger.set_level(Level::Trace)?;
    logger.set_environment("dev");
    logger.set_labels("demo,text");

    logger.error("Hello error!")?;
    logger.warn("Hello warn!")?;
    logger.info("Hello info!")?;
    logger.debug("Hello debug!")?;
    logger.trace("Hello trace!")?;
    logger.print("Hello print!")?;

    let mut fields = Fields::new();
    fields.insert("user".to_string(), "bob".into());
    fields.insert("attempt".to_string(), 3.into());
    logger.infov("Hello fields!", &fields)?;

    logger.apply().map_err(|err| {
        logfacade::Error::config("failed to install the logger").with_source(err)
    })?;
    log::info!(source = "log crate"; "Hello from log!");
    Ok(())
}
